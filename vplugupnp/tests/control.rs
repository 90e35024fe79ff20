//! Contrôle HTTP d'une prise du registre.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use vplugupnp::events::{RecordingSink, topics};
use vplugupnp::{DeviceIdentity, DeviceRegistry};

fn set_binary_state(value: &str) -> Request<Body> {
    let body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:SetBinaryState xmlns:u="urn:Belkin:service:basicevent:1">
      <BinaryState>{}</BinaryState>
    </u:SetBinaryState>
  </s:Body>
</s:Envelope>"#,
        value
    );

    Request::builder()
        .method("POST")
        .uri("/upnp/control/basicevent1")
        .header("SOAPACTION", "\"urn:Belkin:service:basicevent:1#SetBinaryState\"")
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_binary_state_sequence() {
    let sink = Arc::new(RecordingSink::new());
    let registry = DeviceRegistry::new(
        vec![DeviceIdentity::new("uuid-aaaa", "aaaa", "lamp", 11000)],
        "127.0.0.1",
        sink.clone(),
    )
    .unwrap();
    let router = registry.devices()[0].router();

    for value in ["1", "0", "5"] {
        let response = router.clone().oneshot(set_binary_state(value)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let events = sink.by_topic(topics::DEVICE_EVENT);
    let commands: Vec<&str> = events
        .iter()
        .map(|e| e.data["command"].as_str().unwrap())
        .collect();
    assert_eq!(commands, vec!["ON", "OFF"]);
    assert!(events.iter().all(|e| e.data["uuid"] == "uuid-aaaa"));
    assert!(sink.by_topic(topics::ERROR_DEVICE).is_empty());
}

#[tokio::test]
async fn test_settings_for_each_device() {
    let sink = Arc::new(RecordingSink::new());
    let registry = DeviceRegistry::new(
        vec![
            DeviceIdentity::new("uuid-aaaa", "aaaa", "lamp", 11000),
            DeviceIdentity::new("uuid-bbbb", "bbbb", "fan", 11001),
        ],
        "127.0.0.1",
        sink.clone(),
    )
    .unwrap();

    for device in registry.devices() {
        let request = Request::builder()
            .uri("/settings.xml")
            .body(Body::empty())
            .unwrap();
        let response = device.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains(&format!("<UDN>{}</UDN>", device.identity().udn())));
        assert!(xml.contains(&format!(
            "<friendlyName>{}</friendlyName>",
            device.identity().name
        )));
    }

    assert_eq!(sink.by_topic(topics::PROTOCOL_SETTINGS).len(), 2);
}
