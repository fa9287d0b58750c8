//! WebSocket connection to the backend's Socket.IO endpoint.
//!
//! Inbound events are forwarded to the dashboard controller in the order
//! they arrive; outbound events are written once the default namespace has
//! been joined. A dropped connection is retried after a fixed delay.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::dashboard::{DashboardHandle, DashboardInput};
use crate::events::{EventError, InboundEvent, OutboundEvent};
use crate::socketio::{self, Frame, OpenInfo};

/// What the session loop should do with a decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    Nothing,
    /// Engine.IO session opened; join the namespace and arm the heartbeat.
    Open(OpenInfo),
    Reply(&'static str),
    Deliver(InboundEvent),
    Joined,
    Closed,
}

/// Map one text frame to an action. Undecodable frames are logged and dropped.
pub fn interpret_frame(text: &str) -> FrameAction {
    let frame = match socketio::decode_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable frame");
            return FrameAction::Nothing;
        }
    };
    match frame {
        Frame::Open(info) => {
            tracing::debug!(
                sid = %info.sid,
                ping_interval_ms = info.ping_interval,
                ping_timeout_ms = info.ping_timeout,
                "Engine.IO session open"
            );
            FrameAction::Open(info)
        }
        Frame::Ping => FrameAction::Reply(socketio::PONG),
        Frame::Pong | Frame::Ignored => FrameAction::Nothing,
        Frame::Connected => FrameAction::Joined,
        Frame::Close | Frame::Disconnected => FrameAction::Closed,
        Frame::ConnectError(message) => {
            tracing::warn!(%message, "Backend refused namespace connection");
            FrameAction::Closed
        }
        Frame::Event { name, data } => match InboundEvent::from_parts(&name, data) {
            Ok(event) => FrameAction::Deliver(event),
            Err(EventError::Unknown(name)) => {
                tracing::debug!(event = %name, "Ignoring unknown event");
                FrameAction::Nothing
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed event");
                FrameAction::Nothing
            }
        },
    }
}

/// Keep a connection to `url` alive until `cancel` fires.
pub async fn run(
    url: String,
    handle: DashboardHandle,
    mut outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        tracing::info!(url = %url, attempt, "Connecting to backend");

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            res = connect_async(url.as_str()) => res,
        };
        match connected {
            Ok((ws_stream, _response)) => {
                tracing::info!("Backend WebSocket connected");
                attempt = 0;
                if !run_session(ws_stream, &handle, &mut outbound, &cancel).await {
                    break;
                }
                tracing::warn!("Backend session ended, reconnecting");
            }
            Err(e) => {
                tracing::error!(error = %e, "Backend WebSocket connection failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
    tracing::debug!("Transport stopped");
}

/// How long the backend may stay silent before the session is presumed dead.
///
/// `None` when the handshake advertised no heartbeat.
pub fn heartbeat_deadline(info: &OpenInfo) -> Option<Duration> {
    let total = info.ping_interval.saturating_add(info.ping_timeout);
    (total > 0).then(|| Duration::from_millis(total))
}

/// Drive one WebSocket session. Returns `false` when the client should stop
/// entirely (cancelled, or the controller is gone).
pub async fn run_session<S>(
    ws_stream: WebSocketStream<S>,
    handle: &DashboardHandle,
    outbound: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    cancel: &CancellationToken,
) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws_stream.split();
    let mut joined = false;
    let mut heartbeat: Option<Duration> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return false;
            }
            Some(event) = outbound.recv(), if joined => {
                let frame = socketio::encode_event(event);
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    tracing::error!(error = %e, event = event.name(), "Failed to send event");
                    return true;
                }
                tracing::debug!(event = event.name(), "Sent event");
            }
            _ = tokio::time::sleep_until(deadline), if heartbeat.is_some() => {
                tracing::warn!("Backend heartbeat missed, dropping session");
                return true;
            }
            msg = stream.next() => {
                if let Some(window) = heartbeat {
                    deadline = Instant::now() + window;
                }
                match msg {
                    Some(Ok(Message::Text(text))) => match interpret_frame(&text) {
                        FrameAction::Nothing => {}
                        FrameAction::Open(info) => {
                            heartbeat = heartbeat_deadline(&info);
                            if let Some(window) = heartbeat {
                                deadline = Instant::now() + window;
                            }
                            let join = socketio::CONNECT_NAMESPACE.to_string();
                            if let Err(e) = sink.send(Message::Text(join)).await {
                                tracing::error!(error = %e, "Failed to join namespace");
                                return true;
                            }
                        }
                        FrameAction::Reply(reply) => {
                            if let Err(e) = sink.send(Message::Text(reply.to_string())).await {
                                tracing::error!(error = %e, "Failed to reply to backend");
                                return true;
                            }
                        }
                        FrameAction::Joined => {
                            tracing::info!("Joined backend event namespace");
                            joined = true;
                        }
                        FrameAction::Deliver(event) => {
                            if !handle.send(DashboardInput::Event(event)) {
                                return false;
                            }
                        }
                        FrameAction::Closed => return true,
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Backend closed WebSocket");
                        return true;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "WebSocket receive error");
                        return true;
                    }
                    None => {
                        tracing::info!("WebSocket stream exhausted");
                        return true;
                    }
                }
            }
        }
    }
}
