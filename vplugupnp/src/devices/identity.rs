use crate::control::UDN_PREFIX;
use vplugconfig::DeviceRecord;

/// Identité d'un device virtuel, immuable après création
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub uuid: String,
    pub short_id: String,
    pub name: String,
    pub port: u16,
}

impl DeviceIdentity {
    pub fn new(
        uuid: impl Into<String>,
        short_id: impl Into<String>,
        name: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            short_id: short_id.into(),
            name: name.into(),
            port,
        }
    }

    /// `uuid:Socket-1_0-<short_id>`
    pub fn udn(&self) -> String {
        format!("{}{}", UDN_PREFIX, self.short_id)
    }
}

impl From<DeviceRecord> for DeviceIdentity {
    fn from(record: DeviceRecord) -> Self {
        Self {
            uuid: record.uuid,
            short_id: record.short_id,
            name: record.name,
            port: record.port,
        }
    }
}
