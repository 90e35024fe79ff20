//! # Module Events - Émission d'événements structurés
//!
//! Les devices et le listener SSDP n'écrivent jamais directement dans un
//! transport : ils reçoivent à la construction un `Arc<dyn EventSink>` et lui
//! confient des [`EventRecord`].
//!
//! ## Implémentations
//!
//! - [`EventBus`] : diffusion `tokio::sync::broadcast`, abonnements multiples
//! - [`TracingSink`] : écriture directe en événements `tracing`
//! - [`RecordingSink`] : mémorisation en mémoire (tests, introspection)
//!
//! L'émission ne bloque jamais : un abonné lent perd les anciens
//! enregistrements plutôt que de ralentir les émetteurs.

mod bus;
mod record;
mod sinks;

pub use bus::EventBus;
pub use record::{EventRecord, Severity, topics};
pub use sinks::{RecordingSink, TracingSink, log_record};

/// Capacité d'émission d'événements structurés.
///
/// Les implémentations doivent tolérer des appels concurrents depuis tous les
/// devices et le listener, et ne jamais bloquer l'appelant.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: EventRecord);
}
