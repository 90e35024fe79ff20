use super::{DeviceError, DeviceIdentity};
use crate::control::{Settings, SwitchCommand, decode_basic_event};
use crate::events::{EventRecord, EventSink, topics};
use crate::ssdp::{DiscoveryResponseParams, build_discovery_response};
use axum::{
    Router,
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use vplugserver::{Server, ServerBuilder};

/// Taille maximale acceptée pour un corps de requête de contrôle
const MAX_CONTROL_BODY: usize = 64 * 1024;

/// Cycle de vie de l'endpoint HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Created,
    Listening(SocketAddr),
    Failed,
}

/// Prise virtuelle
///
/// Partagée en `Arc` entre son router HTTP et le listener SSDP. L'identité
/// ne change jamais ; seul l'état de l'endpoint évolue.
pub struct VirtualDevice {
    identity: DeviceIdentity,
    server_ip: String,
    sink: Arc<dyn EventSink>,
    state: Mutex<DeviceState>,
}

impl std::fmt::Debug for VirtualDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDevice")
            .field("identity", &self.identity)
            .field("server_ip", &self.server_ip)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl VirtualDevice {
    pub fn new(
        identity: DeviceIdentity,
        server_ip: impl Into<String>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            identity,
            server_ip: server_ip.into(),
            sink,
            state: Mutex::new(DeviceState::Created),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    pub fn state(&self) -> DeviceState {
        *self.state.lock()
    }

    /// Router HTTP du device
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/settings.xml", any(settings_handler))
            .route("/upnp/control/basicevent1", any(basic_event_handler))
            .fallback(unknown_handler)
            .with_state(Arc::clone(self))
    }

    /// Lie l'endpoint HTTP sur `server_ip:port` et le sert
    ///
    /// # Errors
    ///
    /// [`DeviceError::Bind`] si le port est indisponible ; l'erreur est
    /// aussi émise en `error.device` et le device passe en `Failed`.
    pub async fn start(self: &Arc<Self>, shutdown: CancellationToken) -> Result<Server, DeviceError> {
        let addr = format!("{}:{}", self.server_ip, self.identity.port);
        self.debug(
            "VirtualDevice::start",
            json!({"msg": "starting server", "addr": addr, "name": self.identity.name}),
        );

        let mut server = ServerBuilder::new(
            format!("plug-{}", self.identity.short_id),
            self.server_ip.clone(),
            self.identity.port,
        )
        .build()
        .with_shutdown(shutdown);
        server.add_router("/", self.router()).await;

        match server.start().await {
            Ok(bound) => {
                *self.state.lock() = DeviceState::Listening(bound);
                Ok(server)
            }
            Err(source) => {
                *self.state.lock() = DeviceState::Failed;
                self.error(
                    "VirtualDevice::start",
                    json!({"method": "TcpListener::bind", "err": source.to_string(), "addr": addr}),
                );
                Err(DeviceError::Bind {
                    port: self.identity.port,
                    source,
                })
            }
        }
    }

    /// Trace émise pour chaque requête HTTP reçue
    fn trace_request(&self, request: &Request) {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        self.debug(
            "VirtualDevice::serve_http",
            json!({
                "device_uuid": self.identity.uuid,
                "device_name": self.identity.name,
                "remote_addr": remote_addr,
                "url": request.uri().to_string(),
            }),
        );
    }

    /// Réponse à `/settings.xml`
    pub fn serve_settings(&self) -> Response {
        let settings = Settings::new(self.identity.name.clone(), &self.identity.short_id);

        self.emit(EventRecord::debug(
            topics::PROTOCOL_SETTINGS,
            "VirtualDevice::serve_settings",
            serde_json::to_value(&settings).unwrap_or_default(),
        ));

        match settings.to_xml() {
            Ok(xml) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml")], xml).into_response(),
            Err(e) => {
                self.error(
                    "VirtualDevice::serve_settings",
                    json!({"method": "Settings::to_xml", "err": e.to_string()}),
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    /// Traite un corps `SetBinaryState`
    ///
    /// Retourne la commande publiée en `device.event`, s'il y en a une.
    pub fn handle_basic_event(&self, body: &[u8]) -> Option<SwitchCommand> {
        match decode_basic_event(body) {
            Ok(event) => {
                let command = event.command();
                if let Some(command) = command {
                    self.publish_event(command);
                }
                command
            }
            Err(e) => {
                self.error(
                    "VirtualDevice::handle_basic_event",
                    json!({"method": "decode_basic_event", "err": e.to_string()}),
                );
                None
            }
        }
    }

    fn publish_event(&self, command: SwitchCommand) {
        self.emit(EventRecord::debug(
            topics::DEVICE_EVENT,
            "VirtualDevice::publish_event",
            json!({
                "uuid": self.identity.uuid,
                "name": self.identity.name,
                "command": command.as_str(),
            }),
        ));
    }

    /// Répond à une recherche SSDP correspondante
    ///
    /// `requester` est l'adresse `host:port` relevée par le listener.
    pub async fn on_discovery_match(&self, requester: &str) -> Result<(), DeviceError> {
        match requester.parse::<SocketAddr>() {
            Ok(addr) => self.send_discovery_response(addr).await,
            Err(source) => {
                self.error(
                    "VirtualDevice::on_discovery_match",
                    json!({"method": "SocketAddr::parse", "err": source.to_string(), "raddr": requester}),
                );
                Err(DeviceError::InvalidRequester {
                    requester: requester.to_string(),
                    source,
                })
            }
        }
    }

    /// Paramètres de réponse, date estampillée maintenant
    pub fn response_params(&self) -> DiscoveryResponseParams {
        DiscoveryResponseParams::new(
            self.identity.name.clone(),
            self.server_ip.clone(),
            self.identity.port,
            self.identity.uuid.clone(),
            self.identity.short_id.clone(),
        )
    }

    /// Envoie la réponse unicast depuis un socket éphémère
    pub async fn send_discovery_response(&self, to: SocketAddr) -> Result<(), DeviceError> {
        const CONTEXT: &str = "VirtualDevice::send_discovery_response";

        let params = self.response_params();
        let packet = build_discovery_response(&params);

        let local: SocketAddr = if to.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = match UdpSocket::bind(local).await {
            Ok(socket) => socket,
            Err(source) => {
                self.error(
                    CONTEXT,
                    json!({"method": "UdpSocket::bind", "err": source.to_string(), "raddr": to.to_string()}),
                );
                return Err(DeviceError::DiscoveryResponse { addr: to, source });
            }
        };

        self.debug(
            CONTEXT,
            json!({"DiscoveryResponseParams": params, "raddr": to.to_string()}),
        );

        if let Err(source) = socket.send_to(&packet, to).await {
            self.error(
                CONTEXT,
                json!({"method": "UdpSocket::send_to", "err": source.to_string(), "raddr": to.to_string()}),
            );
            return Err(DeviceError::DiscoveryResponse { addr: to, source });
        }

        Ok(())
    }

    /// Confie un enregistrement au sink
    pub fn emit(&self, record: EventRecord) {
        self.sink.emit(record);
    }

    fn debug(&self, context: &str, data: Value) {
        self.emit(EventRecord::debug(topics::DEBUG_DEVICE, context, data));
    }

    fn error(&self, context: &str, data: Value) {
        self.emit(EventRecord::error(topics::ERROR_DEVICE, context, data));
    }
}

async fn settings_handler(
    State(device): State<Arc<VirtualDevice>>,
    request: Request,
) -> Response {
    device.trace_request(&request);
    device.serve_settings()
}

async fn basic_event_handler(
    State(device): State<Arc<VirtualDevice>>,
    request: Request,
) -> StatusCode {
    device.trace_request(&request);

    match to_bytes(request.into_body(), MAX_CONTROL_BODY).await {
        Ok(body) => {
            device.handle_basic_event(&body);
        }
        Err(e) => device.error(
            "VirtualDevice::handle_basic_event",
            json!({"method": "to_bytes", "err": e.to_string()}),
        ),
    }

    StatusCode::OK
}

async fn unknown_handler(State(device): State<Arc<VirtualDevice>>, request: Request) -> StatusCode {
    device.trace_request(&request);
    device.debug(
        "VirtualDevice::serve_http",
        json!({"msg": "unknown request url", "url": request.uri().to_string()}),
    );
    StatusCode::OK
}
