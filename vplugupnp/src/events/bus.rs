//! Bus d'événements en mémoire basé sur `tokio::sync::broadcast`.

use super::{EventRecord, EventSink, log_record};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bus de diffusion des événements
///
/// Chaque abonné reçoit tous les enregistrements émis après son abonnement.
/// `emit` ne bloque jamais ; sans abonné, l'enregistrement est perdu.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
}

impl EventBus {
    /// Crée un bus pouvant retenir `capacity` enregistrements par abonné.
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    /// Lance une tâche qui journalise chaque enregistrement via `tracing`
    ///
    /// La tâche se termine quand `shutdown` est annulé ou quand tous les
    /// émetteurs ont disparu.
    pub fn spawn_forwarder(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.subscribe();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    received = rx.recv() => received,
                };

                match received {
                    Ok(record) => log_record(&record),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Event forwarder lagged, {} record(s) dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl EventSink for EventBus {
    fn emit(&self, record: EventRecord) {
        let _ = self.tx.send(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::topics;
    use serde_json::json;

    #[tokio::test]
    async fn test_every_subscriber_receives_records() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(EventRecord::debug(
            topics::DEVICE_EVENT,
            "test",
            json!({"command": "ON"}),
        ));

        assert_eq!(first.recv().await.unwrap().data["command"], "ON");
        assert_eq!(second.recv().await.unwrap().topic, topics::DEVICE_EVENT);
    }

    #[test]
    fn test_emit_without_subscriber_does_not_fail() {
        let bus = EventBus::new(0);
        bus.emit(EventRecord::debug(topics::DEBUG_DEVICE, "test", json!({})));

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forwarder_stops_on_shutdown() {
        let bus = EventBus::new(4);
        let token = CancellationToken::new();
        let handle = bus.spawn_forwarder(token.clone());

        bus.emit(EventRecord::error(topics::ERROR_DEVICE, "test", json!({})));
        token.cancel();

        handle.await.unwrap();
    }
}
