//! Listener SSDP : boucle de réception sur le socket multicast.

use super::{DiscoveryRequest, RECV_BUFFER_SIZE, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpError};
use crate::events::{EventRecord, EventSink, topics};
use crate::devices::VirtualDevice;
use serde_json::json;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Pause après une erreur de réception
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Ouvre le socket de réception SSDP
///
/// Lié à `0.0.0.0:1900` avec `SO_REUSEADDR`, puis inscrit au groupe
/// `239.255.255.250` sur `interface`.
pub fn bind_multicast(interface: Ipv4Addr) -> Result<UdpSocket, SsdpError> {
    let bind_error = |source: std::io::Error| SsdpError::Bind {
        port: SSDP_PORT,
        source,
    };

    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_error)?;
    socket.set_reuse_address(true).map_err(bind_error)?;

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, SSDP_PORT));
    socket.bind(&bind_addr.into()).map_err(bind_error)?;

    socket
        .join_multicast_v4(&SSDP_MULTICAST_ADDR, &interface)
        .map_err(|source| SsdpError::JoinMulticast {
            group: SSDP_MULTICAST_ADDR,
            interface,
            source,
        })?;

    socket.set_multicast_loop_v4(true).map_err(bind_error)?;
    socket.set_nonblocking(true).map_err(bind_error)?;

    let std_socket: std::net::UdpSocket = socket.into();
    let socket = UdpSocket::from_std(std_socket).map_err(bind_error)?;

    info!(
        "✅ SSDP listener bound on {}:{} (interface {})",
        SSDP_MULTICAST_ADDR, SSDP_PORT, interface
    );

    Ok(socket)
}

/// Listener des requêtes de découverte
///
/// Possède seul le socket de réception. Chaque requête Belkin est transmise à
/// tous les devices fournis ; chaque réponse part dans sa propre tâche.
pub struct DiscoveryListener {
    socket: UdpSocket,
    devices: Vec<Arc<VirtualDevice>>,
    sink: Arc<dyn EventSink>,
    error_backoff: Duration,
}

impl DiscoveryListener {
    pub fn new(
        socket: UdpSocket,
        devices: Vec<Arc<VirtualDevice>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            socket,
            devices,
            sink,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    /// Adresse locale du socket de réception
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Traite un paquet reçu
    ///
    /// # Returns
    ///
    /// Le nombre de devices auxquels la requête a été transmise.
    pub fn handle_packet(&self, packet: &[u8], from: SocketAddr) -> usize {
        let request = DiscoveryRequest::parse(packet).with_requester(from);

        if !request.is_device_request() {
            return 0;
        }

        self.sink.emit(EventRecord::debug(
            topics::DEBUG_DISCOVERY,
            "DiscoveryListener::handle_packet",
            json!({
                "requester": request.requester,
                "search": request.is_search(),
                "man": request.man,
                "mx": request.mx,
                "st": request.st,
            }),
        ));

        self.dispatch(request)
    }

    /// Transmet la requête à chaque device
    fn dispatch(&self, request: DiscoveryRequest) -> usize {
        let request = Arc::new(request);

        for device in &self.devices {
            let device = Arc::clone(device);
            let request = Arc::clone(&request);
            tokio::spawn(async move {
                if let Err(e) = device.on_discovery_match(&request.requester).await {
                    debug!(
                        "Discovery response from '{}' to {} dropped: {}",
                        device.identity().name,
                        request.requester,
                        e
                    );
                }
            });
        }

        self.devices.len()
    }

    /// Boucle de réception
    ///
    /// Ne se termine que lorsque `shutdown` est annulé. Une erreur de lecture
    /// est signalée puis suivie d'une pause avant la lecture suivante.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, from)) => {
                    self.handle_packet(&buf[..len], from);
                }
                Err(e) => {
                    if !self.recover_from_error(&e, &shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("👋 SSDP listener stopped");
    }

    /// Signale une erreur de lecture puis attend la pause configurée
    ///
    /// Retourne `false` si `shutdown` est annulé pendant la pause.
    async fn recover_from_error(&self, err: &std::io::Error, shutdown: &CancellationToken) -> bool {
        self.sink.emit(EventRecord::error(
            topics::ERROR_DISCOVERY,
            "DiscoveryListener::run",
            json!({"method": "UdpSocket::recv_from", "err": err.to_string()}),
        ));

        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.error_backoff) => true,
        }
    }
}
