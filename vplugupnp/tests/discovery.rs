//! Découverte de bout en bout sur la boucle locale.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use vplugupnp::devices::DeviceState;
use vplugupnp::events::{RecordingSink, topics};
use vplugupnp::ssdp::DiscoveryListener;
use vplugupnp::{DeviceIdentity, DeviceRegistry, EventSink, Orchestrator, VirtualDevice};

const BELKIN_SEARCH: &[u8] = b"M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 2\r\n\
    ST: urn:Belkin:device:**\r\n\
    \r\n";

const ROOTDEVICE_SEARCH: &[u8] = b"M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 2\r\n\
    ST: upnp:rootdevice\r\n\
    \r\n";

fn two_plugs(sink: Arc<dyn EventSink>) -> Vec<Arc<VirtualDevice>> {
    let registry = DeviceRegistry::new(
        vec![
            DeviceIdentity::new("11111111-2222-3333-4444-aaaa", "aaaa", "lamp", 11000),
            DeviceIdentity::new("11111111-2222-3333-4444-bbbb", "bbbb", "fan", 11001),
        ],
        "127.0.0.1",
        sink,
    )
    .unwrap();
    registry.devices().to_vec()
}

async fn receive_all(socket: &UdpSocket, wait: Duration) -> Vec<String> {
    let mut responses = Vec::new();
    let mut buf = [0u8; 2048];

    while let Ok(Ok((len, _))) = tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
        responses.push(String::from_utf8_lossy(&buf[..len]).into_owned());
    }

    responses
}

#[tokio::test]
async fn test_two_devices_answer_a_belkin_search() {
    let sink = Arc::new(RecordingSink::new());
    let devices = two_plugs(sink.clone());

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listener = Arc::new(DiscoveryListener::new(socket, devices, sink.clone()));
    let listener_addr = listener.local_addr().unwrap();

    let token = CancellationToken::new();
    let running = {
        let listener = Arc::clone(&listener);
        let token = token.clone();
        tokio::spawn(async move { listener.run(token).await })
    };

    let requester = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    requester.send_to(BELKIN_SEARCH, listener_addr).await.unwrap();

    let responses = receive_all(&requester, Duration::from_millis(1500)).await;
    assert_eq!(responses.len(), 2);

    let usns: HashSet<String> = responses
        .iter()
        .filter_map(|r| r.lines().find(|l| l.starts_with("USN: ")).map(str::to_string))
        .collect();
    assert!(usns.contains("USN: uuid:Socket-1_0-aaaa::urn:Belkin:device:**"));
    assert!(usns.contains("USN: uuid:Socket-1_0-bbbb::urn:Belkin:device:**"));

    let locations: HashSet<String> = responses
        .iter()
        .filter_map(|r| r.lines().find(|l| l.starts_with("LOCATION: ")).map(str::to_string))
        .collect();
    assert!(locations.contains("LOCATION: http://127.0.0.1:11000/settings.xml"));
    assert!(locations.contains("LOCATION: http://127.0.0.1:11001/settings.xml"));

    let discovery = sink.by_topic(topics::DEBUG_DISCOVERY);
    assert_eq!(discovery.len(), 1);
    assert_eq!(discovery[0].data["st"], "urn:Belkin:device:**");
    assert_eq!(
        discovery[0].data["requester"],
        requester.local_addr().unwrap().to_string()
    );

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_rootdevice_search_is_not_answered() {
    let sink = Arc::new(RecordingSink::new());
    let devices = two_plugs(sink.clone());

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listener = DiscoveryListener::new(socket, devices, sink.clone());

    let requester = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let from = requester.local_addr().unwrap();

    assert_eq!(listener.handle_packet(ROOTDEVICE_SEARCH, from), 0);
    assert_eq!(listener.handle_packet(b"garbage without structure", from), 0);

    let responses = receive_all(&requester, Duration::from_millis(300)).await;
    assert!(responses.is_empty());
    assert!(sink.by_topic(topics::DEBUG_DISCOVERY).is_empty());
}

#[tokio::test]
async fn test_handle_packet_dispatches_to_every_device() {
    let sink = Arc::new(RecordingSink::new());
    let devices = two_plugs(sink.clone());

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listener = DiscoveryListener::new(socket, devices, sink.clone());

    let requester = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let from = requester.local_addr().unwrap();

    assert_eq!(listener.handle_packet(BELKIN_SEARCH, from), 2);
    assert_eq!(
        receive_all(&requester, Duration::from_millis(1500)).await.len(),
        2
    );
}

#[tokio::test]
async fn test_orchestrator_answers_with_shared_socket() {
    let sink = Arc::new(RecordingSink::new());
    let registry = DeviceRegistry::new(
        vec![DeviceIdentity::new("uuid-cccc", "cccc", "heater", 0)],
        "127.0.0.1",
        sink.clone(),
    )
    .unwrap();
    let orchestrator = Arc::new(Orchestrator::new(registry, sink.clone()));

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listener_addr = socket.local_addr().unwrap();

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_with_socket(socket).await })
    };

    let requester = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    requester.send_to(BELKIN_SEARCH, listener_addr).await.unwrap();

    let responses = receive_all(&requester, Duration::from_millis(1500)).await;
    assert_eq!(responses.len(), 1);
    assert!(responses[0].contains("USN: uuid:Socket-1_0-cccc::urn:Belkin:device:**\r\n"));

    orchestrator.stop();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_bind_failure_stays_with_its_device() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let busy_port = occupied.local_addr().unwrap().port();

    let sink = Arc::new(RecordingSink::new());
    let registry = DeviceRegistry::new(
        vec![
            DeviceIdentity::new("uuid-dddd", "dddd", "busy", busy_port),
            DeviceIdentity::new("uuid-eeee", "eeee", "sibling", 0),
        ],
        "127.0.0.1",
        sink.clone(),
    )
    .unwrap();
    let orchestrator = Arc::new(Orchestrator::new(registry, sink.clone()));

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listener_addr = socket.local_addr().unwrap();

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_with_socket(socket).await })
    };

    let busy = Arc::clone(&orchestrator.registry().devices()[0]);
    let sibling = Arc::clone(&orchestrator.registry().devices()[1]);

    let mut sibling_addr = None;
    for _ in 0..100 {
        if let DeviceState::Listening(addr) = sibling.state() {
            sibling_addr = Some(addr);
        }
        if sibling_addr.is_some() && busy.state() == DeviceState::Failed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let sibling_addr = sibling_addr.expect("sibling should be listening");
    assert_eq!(busy.state(), DeviceState::Failed);

    let errors = sink.by_topic(topics::ERROR_DEVICE);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].context, "VirtualDevice::start");

    let mut stream = TcpStream::connect(sibling_addr).await.unwrap();
    stream
        .write_all(b"GET /settings.xml HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("<friendlyName>sibling</friendlyName>"));

    let requester = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    requester.send_to(BELKIN_SEARCH, listener_addr).await.unwrap();

    let responses = receive_all(&requester, Duration::from_millis(1500)).await;
    assert_eq!(responses.len(), 2);
    let busy_location = format!("LOCATION: http://127.0.0.1:{}/settings.xml\r\n", busy_port);
    assert!(responses.iter().any(|r| r.contains(&busy_location)));

    orchestrator.stop();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    drop(occupied);
}
