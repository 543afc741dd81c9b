// Verify the wire format browser subscribers and webhook senders rely on.

use chrono::{TimeZone, Utc};
use serde_json::json;
use sigrelay_protocol::{Frame, RelayEvent, Signal, SignalClock, SignalPayload};
use std::sync::Arc;

fn signal(kind: &str, id: u64) -> Arc<Signal> {
    let payload = SignalPayload::from_value(json!({"type": kind, "price": 2350.5})).unwrap();
    let time = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
    Arc::new(Signal::new(payload, time, id))
}

#[test]
fn signal_flattens_payload_with_system_fields() {
    let json = serde_json::to_value(signal("BUY", 1)).unwrap();
    assert_eq!(
        json,
        json!({
            "type": "BUY",
            "price": 2350.5,
            "time": "2026-01-05T09:30:00.000Z",
            "id": 1
        })
    );
}

#[test]
fn signal_event_shape() {
    let ev = RelayEvent::Signal {
        signal: signal("BUY", 3),
    };
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "signal");
    assert_eq!(json["signal"]["type"], "BUY");
    assert_eq!(json["signal"]["id"], 3);
}

#[test]
fn history_event_preserves_order() {
    let ev = RelayEvent::History {
        signals: vec![signal("A", 1), signal("B", 2)],
    };
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "history");
    let ids: Vec<u64> = json["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn empty_history_is_an_empty_array() {
    let json = serde_json::to_string(&RelayEvent::History { signals: vec![] }).unwrap();
    assert_eq!(json, r#"{"type":"history","signals":[]}"#);
}

#[test]
fn clear_event_is_bare() {
    let json = serde_json::to_string(&RelayEvent::Clear).unwrap();
    assert_eq!(json, r#"{"type":"clear"}"#);
}

#[test]
fn frame_decodes_back_to_event() {
    let ev = RelayEvent::Signal {
        signal: signal("SELL", 9),
    };
    let frame = Frame::encode(&ev).unwrap();
    assert_eq!(frame.decode(), Some(ev));
    assert!(!frame.is_heartbeat());
}

#[test]
fn heartbeat_frame_carries_no_data() {
    assert!(Frame::Heartbeat.data().is_none());
    assert!(Frame::Heartbeat.decode().is_none());
}

#[test]
fn text_plain_json_body_is_accepted() {
    // TradingView posts alert messages verbatim; content type is not trusted.
    let body = br#"{"type":"BUY","symbol":"XAUUSD"}"#;
    let payload = SignalPayload::parse(body).unwrap();
    let signal = SignalClock::new().stamp(payload);
    let json = serde_json::to_value(&signal).unwrap();
    assert_eq!(json["symbol"], "XAUUSD");
    assert!(json["id"].as_u64().unwrap() > 0);
    assert!(json["time"].as_str().unwrap().ends_with('Z'));
}
