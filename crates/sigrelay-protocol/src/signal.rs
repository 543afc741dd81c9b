use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sigrelay_core::error::RelayError;
use thiserror::Error;

/// Keys the relay assigns itself; caller-supplied values are discarded.
const SYSTEM_KEYS: [&str; 2] = ["time", "id"];

/// Why an inbound payload was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("body is not valid JSON")]
    InvalidJson,

    #[error("body must be a JSON object")]
    NotAnObject,

    #[error("payload is missing a `type` field")]
    MissingType,
}

impl From<IngestError> for RelayError {
    fn from(e: IngestError) -> Self {
        RelayError::InvalidPayload(e.to_string())
    }
}

/// A caller-supplied payload that passed validation but has not been stamped yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPayload(Map<String, Value>);

impl SignalPayload {
    /// Parse a raw request body. The content type is not trusted; webhook
    /// senders often post JSON as `text/plain`.
    pub fn parse(body: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| IngestError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value.
    ///
    /// `type` must be present and truthy: `null`, `false`, `0` and `""` are
    /// all treated as missing.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        let Value::Object(mut map) = value else {
            return Err(IngestError::NotAnObject);
        };
        if !map.get("type").is_some_and(is_truthy) {
            return Err(IngestError::MissingType);
        }
        for key in SYSTEM_KEYS {
            map.remove(key);
        }
        Ok(Self(map))
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One ingested trading event. Immutable once built; shared as `Arc<Signal>`.
///
/// Wire: the payload keys flattened next to `time` and `id`, e.g.
/// `{"type":"BUY","price":2350.5,"time":"2026-01-05T09:30:00.000Z","id":1767605400000}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(flatten)]
    payload: Map<String, Value>,
    #[serde(with = "iso_millis")]
    time: DateTime<Utc>,
    id: u64,
}

impl Signal {
    pub fn new(payload: SignalPayload, time: DateTime<Utc>, id: u64) -> Self {
        Self {
            payload: payload.0,
            time,
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn kind(&self) -> &Value {
        self.payload.get("type").unwrap_or(&Value::Null)
    }
}

/// Assigns `time` and `id` at ingestion.
///
/// `id` is wall-clock milliseconds, clamped so it never goes below an id
/// already handed out. Two signals in the same millisecond share an id.
#[derive(Debug, Default)]
pub struct SignalClock {
    last_id: u64,
}

impl SignalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self, payload: SignalPayload) -> Signal {
        self.stamp_at(payload, Utc::now())
    }

    pub fn stamp_at(&mut self, payload: SignalPayload, now: DateTime<Utc>) -> Signal {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        self.last_id = self.last_id.max(millis);
        Signal::new(payload, now, self.last_id)
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn payload(v: Value) -> SignalPayload {
        SignalPayload::from_value(v).expect("valid payload")
    }

    #[test]
    fn falsy_type_is_missing() {
        for body in [
            json!({}),
            json!({"type": null}),
            json!({"type": false}),
            json!({"type": 0}),
            json!({"type": ""}),
        ] {
            assert_eq!(
                SignalPayload::from_value(body.clone()),
                Err(IngestError::MissingType),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn truthy_type_is_accepted() {
        for body in [
            json!({"type": "BUY"}),
            json!({"type": 1}),
            json!({"type": true}),
            json!({"type": ["x"]}),
        ] {
            assert!(SignalPayload::from_value(body).is_ok());
        }
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        assert_eq!(
            SignalPayload::from_value(json!(["type"])),
            Err(IngestError::NotAnObject)
        );
        assert_eq!(SignalPayload::parse(b"not json"), Err(IngestError::InvalidJson));
        assert_eq!(SignalPayload::parse(b""), Err(IngestError::InvalidJson));
    }

    #[test]
    fn system_keys_are_stripped() {
        let p = payload(json!({"type": "SELL", "time": "yesterday", "id": 7}));
        let mut clock = SignalClock::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        let signal = clock.stamp_at(p, now);

        assert_eq!(signal.id(), now.timestamp_millis() as u64);
        assert!(!signal.payload().contains_key("time"));
        assert!(!signal.payload().contains_key("id"));
        assert_eq!(signal.kind(), &json!("SELL"));
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut clock = SignalClock::new();
        let later = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 1).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();

        let a = clock.stamp_at(payload(json!({"type": "A"})), later);
        let b = clock.stamp_at(payload(json!({"type": "B"})), earlier);
        let c = clock.stamp_at(payload(json!({"type": "C"})), later);

        assert_eq!(b.id(), a.id());
        assert_eq!(c.id(), a.id(), "same millisecond shares an id");
        assert_eq!(b.time(), earlier, "time is not clamped, only id");
    }

    #[test]
    fn time_serializes_with_millis_and_z() {
        let mut clock = SignalClock::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        let signal = clock.stamp_at(payload(json!({"type": "BUY"})), now);
        let wire = serde_json::to_value(&signal).unwrap();
        assert_eq!(wire["time"], "2026-01-05T09:30:00.000Z");
    }
}
