//! # Module Control - Protocole de contrôle HTTP des prises
//!
//! Codec pur, sans I/O :
//!
//! - [`decode_basic_event`] : décodage du corps `SetBinaryState` reçu sur
//!   `/upnp/control/basicevent1`
//! - [`Settings`] : description du device servie sur `/settings.xml`
//!
//! Les éléments XML sont reconnus par leur nom local ; les préfixes de
//! namespace (`s:`, `u:`) sont ignorés.

mod basic_event;
mod settings;

pub use basic_event::{BasicEvent, SwitchCommand, decode_basic_event};
pub use settings::{Settings, SettingsDevice};

/// Préfixe des UDN des prises émulées
pub const UDN_PREFIX: &str = "uuid:Socket-1_0-";

/// Type de device annoncé
pub const DEVICE_TYPE: &str = "urn:EmulatedSocket:device:controllee:1";

pub const MANUFACTURER: &str = "Belkin International Inc.";
pub const MODEL_NAME: &str = "Emulated Socket";
pub const MODEL_NUMBER: &str = "6.022140857";

/// Erreurs du codec de contrôle
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("Root element is '{0}', expected 'Envelope'")]
    NotAnEnvelope(String),

    #[error("Invalid BinaryState '{value}': {source}")]
    InvalidBinaryState {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("XML write error: {0}")]
    Write(String),
}
