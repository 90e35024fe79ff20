use get_if_addrs::get_if_addrs;
use std::collections::HashMap;
use std::net::{IpAddr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Crée un socket UDP lié à `0.0.0.0:0` et le "connecte" vers `8.8.8.8:80`
/// afin de demander au système quelle interface serait utilisée pour sortir.
/// Aucun paquet n'est émis.
///
/// # Returns
///
/// L'adresse IP locale sous forme de `String`, ou `"127.0.0.1"` en cas d'erreur.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste toutes les adresses IPv4 non-loopback des interfaces réseau.
///
/// # Returns
///
/// Une `HashMap` nom d'interface -> adresses. Vide si les interfaces ne
/// peuvent pas être énumérées.
pub fn list_ipv4_addresses() -> HashMap<String, Vec<IpAddr>> {
    let mut result = HashMap::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            let ip = iface.ip();
            if ip.is_loopback() || !ip.is_ipv4() {
                continue;
            }
            let addresses: &mut Vec<IpAddr> = result.entry(iface.name).or_default();
            if !addresses.contains(&ip) {
                addresses.push(ip);
            }
        }
    }

    result
}

/// Indique si `ip` est portée par une interface de la machine.
///
/// Les adresses non spécifiées (`0.0.0.0`) et de loopback sont toujours
/// considérées comme locales.
pub fn is_local_address(ip: &IpAddr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() {
        return true;
    }

    match get_if_addrs() {
        Ok(interfaces) => interfaces.iter().any(|iface| iface.ip() == *ip),
        Err(_) => false,
    }
}
