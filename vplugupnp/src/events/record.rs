//! Enregistrement d'événement.

use serde::Serialize;
use serde_json::Value;

/// Noms des canaux d'événements
pub mod topics {
    /// Traces de fonctionnement d'un device
    pub const DEBUG_DEVICE: &str = "debug.device";

    /// Erreurs d'un device
    pub const ERROR_DEVICE: &str = "error.device";

    /// Changement d'état demandé par un contrôleur
    pub const DEVICE_EVENT: &str = "device.event";

    /// Description servie sur `/settings.xml`
    pub const PROTOCOL_SETTINGS: &str = "protocol.settings";

    /// Traces du listener SSDP
    pub const DEBUG_DISCOVERY: &str = "debug.discovery";

    /// Erreurs du listener SSDP
    pub const ERROR_DISCOVERY: &str = "error.discovery";
}

/// Gravité d'un événement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Error,
}

/// Événement structuré émis par le coeur
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Canal de diffusion (voir [`topics`])
    pub topic: String,

    /// Composant et opération émetteurs (ex: `"VirtualDevice::serve_settings"`)
    pub context: String,

    /// Charge utile libre
    pub data: Value,

    pub severity: Severity,
}

impl EventRecord {
    pub fn new(
        topic: impl Into<String>,
        severity: Severity,
        context: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            context: context.into(),
            data,
            severity,
        }
    }

    pub fn debug(topic: impl Into<String>, context: impl Into<String>, data: Value) -> Self {
        Self::new(topic, Severity::Debug, context, data)
    }

    pub fn error(topic: impl Into<String>, context: impl Into<String>, data: Value) -> Self {
        Self::new(topic, Severity::Error, context, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serialization() {
        let record = EventRecord::error(
            topics::ERROR_DEVICE,
            "VirtualDevice::start",
            json!({"err": "address in use"}),
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["topic"], "error.device");
        assert_eq!(value["context"], "VirtualDevice::start");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["data"]["err"], "address in use");
    }
}
