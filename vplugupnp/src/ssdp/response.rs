//! Construction des réponses unicast aux M-SEARCH.

use super::{BELKIN_SEARCH_TARGET, MAX_AGE};
use crate::control::UDN_PREFIX;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Paramètres d'une réponse de découverte
///
/// Construits juste avant l'envoi : la date est estampillée à la création.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryResponseParams {
    pub device_name: String,
    pub server_ip: String,
    pub server_port: u16,
    pub uuid: String,
    pub short_id: String,
    pub date: String,
}

impl DiscoveryResponseParams {
    pub fn new(
        device_name: impl Into<String>,
        server_ip: impl Into<String>,
        server_port: u16,
        uuid: impl Into<String>,
        short_id: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            server_ip: server_ip.into(),
            server_port,
            uuid: uuid.into(),
            short_id: short_id.into(),
            date: http_date(Utc::now()),
        }
    }

    /// Remplace la date estampillée
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = http_date(date);
        self
    }

    /// URL de la description du device
    pub fn location(&self) -> String {
        format!("http://{}:{}/settings.xml", self.server_ip, self.server_port)
    }

    /// Unique Service Name annoncé
    pub fn usn(&self) -> String {
        format!("{}{}::{}", UDN_PREFIX, self.short_id, BELKIN_SEARCH_TARGET)
    }
}

/// Date au format RFC 1123 en UTC
pub fn http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Construit le paquet de réponse à un M-SEARCH Belkin
///
/// Lignes terminées par CRLF, bloc terminé par une ligne vide.
pub fn build_discovery_response(params: &DiscoveryResponseParams) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age={}\r\n\
         DATE: {}\r\n\
         EXT:\r\n\
         LOCATION: {}\r\n\
         OPT: \"http://schemas.upnp.org/upnp/1/0/\"; ns=01\r\n\
         01-NLS: {}\r\n\
         SERVER: Unspecified, UPnP/1.0, Unspecified\r\n\
         X-User-Agent: redsonic\r\n\
         ST: {}\r\n\
         USN: {}\r\n\
         \r\n",
        MAX_AGE,
        params.date,
        params.location(),
        params.uuid,
        BELKIN_SEARCH_TARGET,
        params.usn(),
    )
    .into_bytes()
}
