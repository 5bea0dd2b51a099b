//! Per-connection event dispatch.
//!
//! A [`Session`] is created when a client connects and dropped when it
//! disconnects.  It never owns the backend; it asks the shared
//! [`BackendResolver`] for it on every event (a cheap cached lookup once
//! resolution has finished, an await while it is still running).
//!
//! # Lifecycle
//!
//! ```text
//! Connected ──frame──▶ Processing ──done──▶ Connected
//!     │                                        │
//!     └──────────── queue closed ──────────────┴──▶ Disconnected
//! ```
//!
//! [`Session::run`] consumes the session's inbound queue in order and awaits
//! each operation before taking the next frame.  Different sessions run as
//! different tasks and interleave freely at every await point.
//!
//! # Failure policy
//!
//! Nothing a session does is ever reported to the client:
//!
//! | Situation                 | [`Dispatch`] | Logged        |
//! |---------------------------|--------------|---------------|
//! | backend call succeeded    | `Applied`    | trace         |
//! | frame not recognised      | `Ignored`    | debug         |
//! | no backend on this host   | `Dropped`    | no (warned once at resolution) |
//! | backend call failed       | `Failed`     | warn          |

use std::net::SocketAddr;
use std::sync::Arc;

use pointer_core::protocol::{ChannelFrame, MouseAction, MouseEvent};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::application::resolver::BackendResolver;

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The backend performed the operation.
    Applied,
    /// The frame was malformed or named an unknown event/action.
    Ignored,
    /// No backend is available; the event was discarded.
    Dropped,
    /// The backend rejected the operation; the event is lost.
    Failed,
}

/// Per-session counters, logged when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub applied: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl SessionStats {
    fn record(&mut self, outcome: Dispatch) {
        match outcome {
            Dispatch::Applied => self.applied += 1,
            Dispatch::Ignored => self.ignored += 1,
            Dispatch::Dropped => self.dropped += 1,
            Dispatch::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.applied + self.ignored + self.dropped + self.failed
    }
}

/// Server-side state bound to one client connection.
pub struct Session {
    id: Uuid,
    peer: Option<SocketAddr>,
    resolver: Arc<BackendResolver>,
}

impl Session {
    /// Creates a session with a fresh identifier.
    pub fn new(resolver: Arc<BackendResolver>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer: None,
            resolver,
        }
    }

    /// Records the remote address for log messages.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Validates a raw frame and dispatches it.
    pub async fn handle_frame(&self, frame: &ChannelFrame) -> Dispatch {
        match MouseEvent::from_frame(frame) {
            Some(event) => self.handle_event(event).await,
            None => {
                debug!(session = %self.id, name = %frame.name, "ignoring unrecognised frame");
                Dispatch::Ignored
            }
        }
    }

    /// Dispatches a validated event to the shared backend.
    pub async fn handle_event(&self, event: MouseEvent) -> Dispatch {
        let handle = self.resolver.resolve().await;
        let Some(backend) = handle.ops() else {
            return Dispatch::Dropped;
        };

        let result = match event {
            MouseEvent::Move { dx, dy } => backend.move_by(dx, dy).await.map(|landed| {
                trace!(session = %self.id, dx, dy, %landed, "pointer moved");
            }),
            MouseEvent::Action(MouseAction::LeftClick) => backend.left_click().await,
            MouseEvent::Action(MouseAction::RightClick) => backend.right_click().await,
        };

        match result {
            Ok(()) => Dispatch::Applied,
            Err(e) => {
                warn!(session = %self.id, ?event, "pointer operation failed: {e}");
                Dispatch::Failed
            }
        }
    }

    /// Processes queued frames in order until the sender side is dropped.
    ///
    /// Frames already queued when the client disconnects are still applied;
    /// an in-flight backend operation is never cancelled.
    pub async fn run(self, mut frames: mpsc::Receiver<ChannelFrame>) -> SessionStats {
        let mut stats = SessionStats::default();
        while let Some(frame) = frames.recv().await {
            let outcome = self.handle_frame(&frame).await;
            stats.record(outcome);
        }
        stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
