//! Décodage des requêtes M-SEARCH.

use super::BELKIN_SEARCH_TARGET;

/// Requête de découverte reçue en multicast
///
/// Construite uniquement à partir des octets du paquet ; seule l'adresse du
/// demandeur est renseignée après coup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Adresse du demandeur (`host:port`)
    pub requester: String,

    /// Première ligne contenant `M-SEARCH *`
    pub action: String,

    pub host: String,

    /// En-tête `MAN`, sans guillemets
    pub man: String,

    pub mx: String,

    /// Cible de recherche (`ST`)
    pub st: String,
}

impl DiscoveryRequest {
    /// Décode un paquet M-SEARCH
    ///
    /// Les octets CR sont ignorés, LF termine une ligne ; un fragment final non
    /// terminé par LF est ignoré. Le décodage n'échoue jamais : un paquet
    /// invalide donne une requête aux champs vides.
    pub fn parse(packet: &[u8]) -> Self {
        let mut req = Self::default();
        let mut line: Vec<u8> = Vec::with_capacity(128);

        for &b in packet {
            match b {
                b'\r' => {}
                b'\n' => {
                    req.parse_line(&String::from_utf8_lossy(&line));
                    line.clear();
                }
                _ => line.push(b),
            }
        }

        req
    }

    fn parse_line(&mut self, line: &str) {
        if line.contains("M-SEARCH *") {
            if self.action.is_empty() {
                self.action = line.to_string();
            }
            return;
        }

        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();

        match name.trim().to_uppercase().as_str() {
            "HOST" => self.host = value.to_string(),
            "MAN" => self.man = trim_quotes(value).to_string(),
            "MX" => self.mx = value.to_string(),
            "ST" => self.st = value.to_string(),
            _ => {}
        }
    }

    /// Renseigne l'adresse du demandeur
    pub fn with_requester(mut self, requester: impl ToString) -> Self {
        self.requester = requester.to_string();
        self
    }

    /// Vrai si la requête cible les prises Belkin (`ST` exact, sensible à la casse)
    pub fn is_device_request(&self) -> bool {
        self.st == BELKIN_SEARCH_TARGET
    }

    /// Vrai si une ligne d'action M-SEARCH a été trouvée
    pub fn is_search(&self) -> bool {
        !self.action.is_empty()
    }
}

/// Retire une paire de guillemets encadrante
fn trim_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}
