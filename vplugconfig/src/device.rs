//! Enregistrement persistant de l'identité d'un device virtuel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identité d'un device virtuel telle que stockée dans `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Nom affiché par les contrôleurs
    pub name: String,

    /// Identifiant unique, stable entre les redémarrages
    pub uuid: String,

    /// Fragment court de l'UUID utilisé dans l'USN et l'UDN
    pub short_id: String,

    /// Port HTTP de contrôle, unique dans le process
    pub port: u16,
}

impl DeviceRecord {
    /// Génère une nouvelle identité avec un UUID v4 frais.
    pub fn generate(name: &str, port: u16) -> Self {
        let uuid = Uuid::new_v4().to_string();
        let short_id = short_id_of(&uuid);

        Self {
            name: name.to_string(),
            uuid,
            short_id,
            port,
        }
    }
}

/// Dernier groupe de l'UUID (après le dernier tiret).
pub fn short_id_of(uuid: &str) -> String {
    uuid.rsplit('-').next().unwrap_or(uuid).to_string()
}
