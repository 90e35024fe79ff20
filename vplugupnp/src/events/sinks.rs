use super::{EventRecord, EventSink, Severity};
use parking_lot::Mutex;
use tracing::{debug, error, info};

/// Journalise un enregistrement avec le niveau correspondant à son canal
///
/// - gravité `error` -> ERROR
/// - canaux `debug.*` -> DEBUG
/// - autres canaux (`device.event`, `protocol.*`) -> INFO
pub fn log_record(record: &EventRecord) {
    match record.severity {
        Severity::Error => error!(
            topic = %record.topic,
            context = %record.context,
            data = %record.data,
            "❌ {}", record.topic
        ),
        Severity::Debug if record.topic.starts_with("debug.") => debug!(
            topic = %record.topic,
            context = %record.context,
            data = %record.data,
            "{}", record.topic
        ),
        Severity::Debug => info!(
            topic = %record.topic,
            context = %record.context,
            data = %record.data,
            "📡 {}", record.topic
        ),
    }
}

/// Sink écrivant directement dans `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, record: EventRecord) {
        log_record(&record);
    }
}

/// Sink mémorisant tous les enregistrements
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<EventRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copie des enregistrements reçus, dans l'ordre d'émission
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Enregistrements d'un canal donné
    pub fn by_topic(&self, topic: &str) -> Vec<EventRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.topic == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::topics;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_recording_sink_filters_by_topic() {
        let sink = RecordingSink::new();
        sink.emit(EventRecord::debug(topics::DEBUG_DEVICE, "a", json!({})));
        sink.emit(EventRecord::debug(topics::DEVICE_EVENT, "b", json!({"command": "OFF"})));

        assert_eq!(sink.records().len(), 2);
        let events = sink.by_topic(topics::DEVICE_EVENT);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context, "b");

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_concurrent_emission() {
        let sink = Arc::new(RecordingSink::new());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        sink.emit(EventRecord::debug(
                            topics::DEBUG_DEVICE,
                            format!("emitter-{}", i),
                            json!({"n": n}),
                        ));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let records = sink.records();
        assert_eq!(records.len(), 200);

        // ordre causal conservé pour chaque émetteur
        for i in 0..4 {
            let context = format!("emitter-{}", i);
            let seq: Vec<i64> = records
                .iter()
                .filter(|r| r.context == context)
                .map(|r| r.data["n"].as_i64().unwrap())
                .collect();
            assert_eq!(seq, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_tracing_sink_accepts_all_severities() {
        let sink = TracingSink;
        sink.emit(EventRecord::debug(topics::DEBUG_DISCOVERY, "t", json!({})));
        sink.emit(EventRecord::debug(topics::DEVICE_EVENT, "t", json!({})));
        sink.emit(EventRecord::error(topics::ERROR_DISCOVERY, "t", json!({})));
    }
}
