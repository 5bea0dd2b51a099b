//! WebSocket event channel.
//!
//! Wraps one client's WebSocket stream and yields [`ChannelEvent`]s: one
//! [`ChannelEvent::Frame`] per usable text frame, then a single
//! [`ChannelEvent::Disconnected`] when the connection ends for any reason.
//!
//! Frames arrive in the order the client sent them.  Text that is not a
//! named event, binary frames and control frames never surface as events;
//! ping/pong and the closing handshake are answered by tokio-tungstenite.

use anyhow::Context;
use futures_util::StreamExt;
use pointer_core::protocol::ChannelFrame;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, warn};

/// What the channel delivered next.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A named event from the client.
    Frame(ChannelFrame),
    /// The connection is gone.  No further events follow.
    Disconnected,
}

/// Inbound side of one client connection.
pub struct EventChannel<S> {
    ws: WebSocketStream<S>,
    closed: bool,
}

impl<S> EventChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Completes the WebSocket handshake on a freshly accepted stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer does not speak WebSocket.
    pub async fn accept(stream: S) -> anyhow::Result<Self> {
        let ws = accept_async(stream)
            .await
            .context("WebSocket handshake failed")?;
        Ok(Self::from_stream(ws))
    }

    /// Wraps an already-upgraded stream.
    pub fn from_stream(ws: WebSocketStream<S>) -> Self {
        Self { ws, closed: false }
    }

    /// Waits for the next event.  After `Disconnected` has been returned once,
    /// every further call returns `Disconnected` immediately.
    pub async fn next_event(&mut self) -> ChannelEvent {
        while !self.closed {
            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(
                    WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Protocol(_),
                )) => {
                    debug!("WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {e}");
                    break;
                }
                None => break,
            };

            match message {
                WsMessage::Text(text) => match ChannelFrame::from_json(&text) {
                    Ok(frame) => return ChannelEvent::Frame(frame),
                    Err(e) => debug!("ignoring text frame: {e}"),
                },
                WsMessage::Binary(data) => {
                    debug!("ignoring binary frame ({} bytes)", data.len());
                }
                WsMessage::Close(_) => {
                    debug!("WebSocket Close frame received");
                    break;
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
        self.closed = true;
        ChannelEvent::Disconnected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
