//! Named push events exchanged with the backend.
//!
//! Inbound events arrive as `(name, payload)` pairs regardless of framing;
//! [`InboundEvent::from_parts`] turns them into a typed value the dashboard
//! can dispatch on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{HostResult, ScanReport};

pub const SCAN_STATUS: &str = "scan_status";
pub const SCAN_RESULTS: &str = "scan_results";
pub const SCAN_ERROR: &str = "scan_error";
pub const WAN_LATENCY: &str = "wan_latency";
pub const START_SCAN: &str = "start_scan";

/// Events pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ScanStatus { status: String },
    ScanResults(ScanReport),
    ScanError { error: String },
    /// Raw probe value in milliseconds, `-1` on timeout.
    WanLatency { latency: f64 },
}

/// Events sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEvent {
    StartScan,
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::StartScan => START_SCAN,
        }
    }
}

#[derive(Deserialize)]
struct StatusPayload {
    status: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

#[derive(Deserialize)]
struct LatencyPayload {
    latency: f64,
}

/// Why a named event could not be turned into an [`InboundEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown event: {0}")]
    Unknown(String),

    #[error("invalid payload for {name}: {source}")]
    Payload {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl InboundEvent {
    /// Build a typed event from its wire name and JSON payload.
    pub fn from_parts(name: &str, data: Value) -> Result<Self, EventError> {
        let payload_err = |source| EventError::Payload {
            name: name.to_string(),
            source,
        };
        match name {
            SCAN_STATUS => {
                let p: StatusPayload = serde_json::from_value(data).map_err(payload_err)?;
                Ok(InboundEvent::ScanStatus { status: p.status })
            }
            SCAN_RESULTS => {
                let report: ScanReport = serde_json::from_value(data).map_err(payload_err)?;
                Ok(InboundEvent::ScanResults(report))
            }
            SCAN_ERROR => {
                let p: ErrorPayload = serde_json::from_value(data).map_err(payload_err)?;
                Ok(InboundEvent::ScanError { error: p.error })
            }
            WAN_LATENCY => {
                let p: LatencyPayload = serde_json::from_value(data).map_err(payload_err)?;
                Ok(InboundEvent::WanLatency { latency: p.latency })
            }
            other => Err(EventError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::ScanStatus { .. } => SCAN_STATUS,
            InboundEvent::ScanResults(_) => SCAN_RESULTS,
            InboundEvent::ScanError { .. } => SCAN_ERROR,
            InboundEvent::WanLatency { .. } => WAN_LATENCY,
        }
    }

    /// Convenience constructor used by replay files and tests.
    pub fn scan_results(timestamp: impl Into<String>, hosts: Vec<HostResult>) -> Self {
        InboundEvent::ScanResults(ScanReport {
            timestamp: timestamp.into(),
            hosts,
            network: None,
            filename: None,
        })
    }
}

/// Self-describing event line: `{"event": "wan_latency", "data": {"latency": 12}}`.
///
/// `time` optionally carries the wall-clock label the event was recorded at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl TryFrom<Envelope> for InboundEvent {
    type Error = EventError;

    fn try_from(env: Envelope) -> Result<Self, Self::Error> {
        InboundEvent::from_parts(&env.event, env.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_known_event() {
        let e = InboundEvent::from_parts(SCAN_STATUS, json!({"status": "En cours..."})).unwrap();
        assert_eq!(e, InboundEvent::ScanStatus { status: "En cours...".into() });

        let e = InboundEvent::from_parts(SCAN_ERROR, json!({"error": "timeout"})).unwrap();
        assert_eq!(e, InboundEvent::ScanError { error: "timeout".into() });

        let e = InboundEvent::from_parts(WAN_LATENCY, json!({"latency": 23.47})).unwrap();
        assert_eq!(e, InboundEvent::WanLatency { latency: 23.47 });

        let e = InboundEvent::from_parts(
            SCAN_RESULTS,
            json!({"timestamp": "T1", "hosts": [], "network": "192.168.1.0/24", "screenshot": "..."}),
        )
        .unwrap();
        match e {
            InboundEvent::ScanResults(r) => {
                assert_eq!(r.timestamp, "T1");
                assert_eq!(r.network.as_deref(), Some("192.168.1.0/24"));
            }
            other => panic!("expected ScanResults, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = InboundEvent::from_parts("cpu_load", json!({})).unwrap_err();
        assert!(matches!(err, EventError::Unknown(n) if n == "cpu_load"));
    }

    #[test]
    fn bad_payload_names_the_event() {
        let err = InboundEvent::from_parts(WAN_LATENCY, json!({"latency": "fast"})).unwrap_err();
        assert!(err.to_string().starts_with("invalid payload for wan_latency"));
    }

    #[test]
    fn envelope_round_trip_into_event() {
        let env: Envelope =
            serde_json::from_str(r#"{"event":"scan_error","data":{"error":"boom"}}"#).unwrap();
        assert_eq!(env.time, None);
        let e = InboundEvent::try_from(env).unwrap();
        assert_eq!(e.name(), SCAN_ERROR);
    }
}
