//! Minimal Socket.IO (Engine.IO v4) text framing over WebSocket.
//!
//! Only what the dashboard needs: the handshake, heartbeats, and named
//! events on the default namespace. Binary attachments and acks are not
//! supported.
//!
//! Packet layout: one Engine.IO type digit, then for `4` (message) one
//! Socket.IO type digit, then an optional JSON body.
//!
//! | frame               | meaning                      |
//! |---------------------|------------------------------|
//! | `0{"sid":..}`       | Engine.IO open               |
//! | `2` / `3`           | ping / pong                  |
//! | `40` / `40{..}`     | namespace connected          |
//! | `41`                | namespace disconnected       |
//! | `42["name",{..}]`   | event                        |

use serde::Deserialize;
use serde_json::Value;

use crate::events::OutboundEvent;

/// Sent once the Engine.IO session is open, to join the default namespace.
pub const CONNECT_NAMESPACE: &str = "40";
/// Reply to a server ping.
pub const PONG: &str = "3";

/// Handshake data carried by the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Connected,
    Disconnected,
    ConnectError(String),
    Event { name: String, data: Value },
    /// Valid but irrelevant packet (noop, upgrade, ack).
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type in frame: {0}")]
    UnknownType(String),

    #[error("malformed event body: {0}")]
    MalformedEvent(String),

    #[error("invalid JSON in frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one WebSocket text frame.
pub fn decode_frame(text: &str) -> Result<Frame, FrameError> {
    let mut chars = text.chars();
    let engine_type = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();
    match engine_type {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_message(rest),
        '5' | '6' => Ok(Frame::Ignored),
        _ => Err(FrameError::UnknownType(text.to_string())),
    }
}

fn decode_message(body: &str) -> Result<Frame, FrameError> {
    let mut chars = body.chars();
    let packet_type = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();
    match packet_type {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => decode_event(rest),
        '3' => Ok(Frame::Ignored),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Frame::ConnectError(message))
        }
        _ => Err(FrameError::UnknownType(format!("4{body}"))),
    }
}

fn decode_event(body: &str) -> Result<Frame, FrameError> {
    if body.starts_with('/') {
        return Err(FrameError::MalformedEvent(format!(
            "non-default namespace: {body}"
        )));
    }
    // Skip an optional ack id.
    let json = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let parts: Vec<Value> = serde_json::from_str(json)?;
    let mut parts = parts.into_iter();
    let name = match parts.next() {
        Some(Value::String(name)) => name,
        _ => return Err(FrameError::MalformedEvent(body.to_string())),
    };
    let data = parts.next().unwrap_or(Value::Null);
    Ok(Frame::Event { name, data })
}

/// Encode an outbound event as a Socket.IO event frame.
pub fn encode_event(event: OutboundEvent) -> String {
    let body = Value::Array(vec![Value::String(event.name().to_string())]);
    format!("42{body}")
}
