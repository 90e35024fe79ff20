/// Utilitaires réseau partagés par les crates VPlug.
///
/// # Fonctions principales
///
/// - [`guess_local_ip`] : Devine l'adresse IP locale utilisée pour les connexions sortantes
/// - [`list_ipv4_addresses`] : Liste les adresses IPv4 non-loopback par interface
/// - [`is_local_address`] : Vérifie qu'une adresse appartient à une interface locale
///
/// # Examples
///
/// ```
/// use vplugutils::guess_local_ip;
///
/// let ip = guess_local_ip();
/// println!("Adresse IP locale: {}", ip);
/// ```
mod ip_utils;

pub use ip_utils::{guess_local_ip, is_local_address, list_ipv4_addresses};
