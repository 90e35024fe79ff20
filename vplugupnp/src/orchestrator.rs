//! # Module Orchestrator - Registre et démarrage des devices
//!
//! Le [`DeviceRegistry`] possède l'ensemble des [`VirtualDevice`] du process.
//! L'[`Orchestrator`] démarre chaque endpoint HTTP dans sa propre tâche puis
//! fait tourner le listener SSDP jusqu'à l'arrêt.

use crate::devices::{DeviceIdentity, VirtualDevice};
use crate::events::EventSink;
use crate::ssdp::{DiscoveryListener, SsdpError, bind_multicast};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Erreurs fatales au démarrage
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Deux devices déclarent le même port de contrôle
    #[error("Port {port} is used by both '{first}' and '{second}'")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    /// Socket de découverte indisponible
    #[error(transparent)]
    Discovery(#[from] SsdpError),
}

/// Ensemble des devices du process
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Arc<VirtualDevice>>,
}

impl DeviceRegistry {
    /// Construit le registre
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::DuplicatePort`] si deux identités partagent un port.
    pub fn new(
        identities: Vec<DeviceIdentity>,
        server_ip: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, OrchestratorError> {
        let mut ports: HashMap<u16, String> = HashMap::new();

        for identity in &identities {
            if let Some(first) = ports.insert(identity.port, identity.name.clone()) {
                return Err(OrchestratorError::DuplicatePort {
                    port: identity.port,
                    first,
                    second: identity.name.clone(),
                });
            }
        }

        let devices = identities
            .into_iter()
            .map(|identity| Arc::new(VirtualDevice::new(identity, server_ip, Arc::clone(&sink))))
            .collect();

        Ok(Self { devices })
    }

    pub fn devices(&self) -> &[Arc<VirtualDevice>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Réglages du listener SSDP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Interface sur laquelle le groupe multicast est rejoint
    pub multicast_interface: Ipv4Addr,

    /// Pause après une erreur de réception
    pub error_backoff: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            error_backoff: crate::ssdp::DEFAULT_ERROR_BACKOFF,
        }
    }
}

/// Démarre les devices et le listener
pub struct Orchestrator {
    registry: Arc<DeviceRegistry>,
    sink: Arc<dyn EventSink>,
    options: DiscoveryOptions,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(registry: DeviceRegistry, sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry: Arc::new(registry),
            sink,
            options: DiscoveryOptions::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_discovery_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    /// Jeton d'arrêt partagé par le listener et tous les endpoints
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Lance chaque endpoint HTTP dans sa propre tâche
    ///
    /// Un échec de bind reste confiné au device concerné.
    pub fn start_devices(&self) -> Vec<JoinHandle<()>> {
        self.registry
            .devices()
            .iter()
            .map(|device| {
                let device = Arc::clone(device);
                let token = self.shutdown.clone();
                tokio::spawn(async move {
                    match device.start(token).await {
                        Ok(mut server) => server.wait().await,
                        Err(e) => warn!(
                            "❌ Device '{}' not started: {}",
                            device.identity().name,
                            e
                        ),
                    }
                })
            })
            .collect()
    }

    /// Démarre tout et bloque jusqu'à l'arrêt
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Discovery`] si le socket multicast ne peut être
    /// ouvert ; le jeton d'arrêt est alors annulé.
    pub async fn run(&self) -> Result<(), OrchestratorError> {
        let handles = self.start_devices();

        let socket = match bind_multicast(self.options.multicast_interface) {
            Ok(socket) => socket,
            Err(e) => {
                self.shutdown.cancel();
                for handle in handles {
                    let _ = handle.await;
                }
                return Err(e.into());
            }
        };

        self.serve_discovery(socket).await;

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Variante de [`run`](Self::run) sur un socket déjà ouvert
    pub async fn run_with_socket(&self, socket: UdpSocket) {
        let handles = self.start_devices();
        self.serve_discovery(socket).await;

        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn serve_discovery(&self, socket: UdpSocket) {
        let listener = DiscoveryListener::new(
            socket,
            self.registry.devices().to_vec(),
            Arc::clone(&self.sink),
        )
        .with_error_backoff(self.options.error_backoff);

        info!(
            "📡 Discovery listener running for {} device(s)",
            self.registry.len()
        );

        listener.run(self.shutdown.clone()).await;
    }

    /// Demande l'arrêt du listener et des endpoints
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;

    fn identity(name: &str, short_id: &str, port: u16) -> DeviceIdentity {
        DeviceIdentity::new(format!("uuid-{}", short_id), short_id, name, port)
    }

    #[test]
    fn test_registry_rejects_duplicate_ports() {
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let err = DeviceRegistry::new(
            vec![identity("a", "aaaa", 11000), identity("b", "bbbb", 11000)],
            "127.0.0.1",
            sink,
        )
        .unwrap_err();

        match err {
            OrchestratorError::DuplicatePort { port, first, second } => {
                assert_eq!(port, 11000);
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_keeps_declaration_order() {
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let registry = DeviceRegistry::new(
            vec![identity("a", "aaaa", 11000), identity("b", "bbbb", 11001)],
            "127.0.0.1",
            sink,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.devices()[1].identity().uuid, "uuid-bbbb");
        assert_eq!(registry.devices()[1].identity().port, 11001);
        assert_eq!(registry.devices()[0].server_ip(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_stop_ends_run_with_socket() {
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let registry = DeviceRegistry::new(vec![identity("a", "aaaa", 0)], "127.0.0.1", sink.clone())
            .unwrap();
        let orchestrator = Arc::new(Orchestrator::new(registry, sink));

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.run_with_socket(socket).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator.stop();

        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
    }
}
