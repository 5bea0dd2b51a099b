//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming connections and upgrading each one to WebSocket.
//! 3. Running two cooperating pieces per client:
//!    - **Reader**: pulls [`ChannelEvent`]s off the socket and pushes frames
//!      into the session's bounded queue.
//!    - **Session task**: drains that queue in order and drives the shared
//!      backend (see [`Session::run`]).
//! 4. Stopping the accept loop when the `running` flag is cleared.
//!
//! When the client goes away the reader drops its end of the queue; the
//! session task finishes whatever is already queued and then ends.  The
//! shared backend is never touched by session teardown.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::{BackendResolver, Session, SessionStats};
use crate::domain::RelayConfig;
use crate::infrastructure::channel::{ChannelEvent, EventChannel};

/// How long `accept()` waits before re-checking the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the relay's TCP listener.
///
/// # Errors
///
/// Returns an error if the address is in use or the process may not bind it.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))
}

/// Binds `config.bind_addr` and serves clients until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: RelayConfig,
    resolver: Arc<BackendResolver>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = bind(config.bind_addr).await?;
    serve(listener, Arc::new(config), resolver, running).await
}

/// Accepts clients on an already-bound listener until `running` is cleared.
///
/// Each client is handed to its own Tokio task so one slow client never
/// delays the others.
///
/// # Errors
///
/// Currently infallible once bound; transient accept errors are logged and
/// the loop continues.
pub async fn serve(
    listener: TcpListener,
    config: Arc<RelayConfig>,
    resolver: Arc<BackendResolver>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("pointer relay listening on {addr}");
    }

    loop {
        // Check the shutdown flag before each accept attempt.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A bounded accept lets the loop notice the flag while idle.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                let cfg = Arc::clone(&config);
                let resolver = Arc::clone(&resolver);

                // One task per client; a slow or stuck client never holds
                // up the accept loop.
                tokio::spawn(async move {
                    handle_client(stream, peer, cfg, resolver).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. too many open files).
                // Log it and keep serving the existing clients.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout: nobody connected within ACCEPT_POLL.
                // Loop back to re-check the `running` flag.
            }
        }
    }

    Ok(())
}

// ── Per-client handling ───────────────────────────────────────────────────────

async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<RelayConfig>,
    resolver: Arc<BackendResolver>,
) {
    let session = Session::new(resolver).with_peer(peer);
    let id = session.id();

    match run_session(stream, session, config.queue_depth).await {
        Ok(stats) => info!(
            session = %id,
            %peer,
            applied = stats.applied,
            ignored = stats.ignored,
            dropped = stats.dropped,
            failed = stats.failed,
            "client disconnected"
        ),
        Err(e) => warn!(session = %id, %peer, "session ended with error: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    session: Session,
    queue_depth: usize,
) -> anyhow::Result<SessionStats> {
    let id = session.id();
    let peer = session.peer();

    let mut channel = EventChannel::accept(stream)
        .await
        .with_context(|| format!("session {id}: handshake with {peer:?} failed"))?;

    info!(session = %id, ?peer, "client connected");

    // Frames are handed to a separate task so a slow backend call never
    // stalls reading (and answering pings) on the socket.
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let worker = tokio::spawn(session.run(rx));

    loop {
        // `Disconnected` covers close frames, socket errors and EOF alike.
        match channel.next_event().await {
            ChannelEvent::Frame(frame) => {
                // A send error means the session task is gone.
                if tx.send(frame).await.is_err() {
                    debug!(session = %id, "session task ended early");
                    break;
                }
            }
            ChannelEvent::Disconnected => break,
        }
    }

    // Closing the queue lets the session drain and finish.
    drop(tx);
    worker
        .await
        .with_context(|| format!("session {id}: session task panicked"))
}
