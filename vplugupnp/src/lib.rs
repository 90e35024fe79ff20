//! # vplugupnp - Découverte SSDP et contrôle HTTP de prises virtuelles
//!
//! Cette crate émule des prises connectées découvrables en SSDP et pilotables
//! en HTTP par les contrôleurs domotiques.
//!
//! ## Architecture
//!
//! - [`ssdp`] : Codec des requêtes M-SEARCH / réponses unicast, listener multicast
//! - [`control`] : Codec du protocole de contrôle (`SetBinaryState`, `settings.xml`)
//! - [`events`] : Abstraction [`EventSink`](events::EventSink) et ses implémentations
//! - [`devices`] : Device virtuel, son endpoint HTTP et sa réponse de découverte
//! - [`orchestrator`] : Registre des devices et démarrage concurrent de l'ensemble
//!
//! ## Flux
//!
//! ```text
//! M-SEARCH (239.255.255.250:1900)
//!     -> DiscoveryListener -> DiscoveryRequest::parse
//!     -> ST == urn:Belkin:device:** ?
//!     -> chaque VirtualDevice -> réponse unicast vers le demandeur
//!
//! POST /upnp/control/basicevent1
//!     -> VirtualDevice -> decode_basic_event -> événement "ON"/"OFF"
//! ```

pub mod control;
pub mod devices;
pub mod events;
pub mod orchestrator;
pub mod ssdp;

pub use devices::{DeviceIdentity, VirtualDevice};
pub use events::{EventBus, EventRecord, EventSink, Severity, TracingSink};
pub use orchestrator::{DeviceRegistry, DiscoveryOptions, Orchestrator, OrchestratorError};
