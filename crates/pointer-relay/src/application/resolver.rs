//! One-time backend discovery.
//!
//! [`BackendResolver`] walks a fixed, priority-ordered list of
//! [`BackendProbe`]s, keeps the first one that initialises, and caches the
//! outcome for the lifetime of the process.  "Nothing worked" is cached too:
//! there is no retry, a restart is the only way to pick up a backend that
//! appeared later.
//!
//! # Single flight
//!
//! The cache is a [`tokio::sync::OnceCell`].  The first caller of
//! [`BackendResolver::resolve`] runs the probe sequence; every concurrent
//! caller awaits that same run and all of them receive a reference to the
//! same [`BackendHandle`].  `main.rs` kicks off resolution at startup so the
//! first client rarely has to wait.
//!
//! # Failure isolation
//!
//! A probe that returns an error *or panics* is logged and skipped.  Neither
//! outcome reaches a session.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use pointer_core::pointer::{BackendError, BackendKind, PointerBackend};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::application::serialized::SerializedBackend;
use crate::domain::BackendSelection;

// ── Probe trait ───────────────────────────────────────────────────────────────

/// A backend candidate that may or may not work on this host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendProbe: Send + Sync {
    /// Which variant this candidate produces when it succeeds.
    fn kind(&self) -> BackendKind;

    /// Name used in logs.
    fn label(&self) -> &'static str;

    /// Attempts to initialise the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] when the mechanism is missing or
    /// refuses to start.
    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError>;
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// The resolved backend outcome shared by every session.
#[derive(Clone)]
pub struct BackendHandle {
    kind: BackendKind,
    ops: Option<Arc<dyn PointerBackend>>,
}

impl BackendHandle {
    fn active(kind: BackendKind, ops: Arc<dyn PointerBackend>) -> Self {
        Self {
            kind,
            ops: Some(ops),
        }
    }

    /// The "no backend" outcome.
    pub fn unavailable() -> Self {
        Self {
            kind: BackendKind::Unavailable,
            ops: None,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// The backend operations, or `None` when input is disabled.
    pub fn ops(&self) -> Option<&Arc<dyn PointerBackend>> {
        self.ops.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.ops.is_some()
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("kind", &self.kind)
            .field("backend", &self.ops.as_ref().map(|ops| ops.name()))
            .finish()
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Process-wide backend resolver.  Create one, wrap it in an `Arc`, and hand
/// clones to the accept loop.
pub struct BackendResolver {
    candidates: Vec<Box<dyn BackendProbe>>,
    selection: BackendSelection,
    serialize_input: bool,
    resolved: OnceCell<BackendHandle>,
}

impl BackendResolver {
    /// Creates a resolver over `candidates`, given in priority order.
    ///
    /// Candidates whose kind `selection` does not allow are never probed.
    /// With `serialize_input`, the chosen backend is wrapped in a
    /// [`SerializedBackend`].
    pub fn new(
        candidates: Vec<Box<dyn BackendProbe>>,
        selection: BackendSelection,
        serialize_input: bool,
    ) -> Self {
        Self {
            candidates,
            selection,
            serialize_input,
            resolved: OnceCell::new(),
        }
    }

    /// Returns the process-wide backend, probing on first use.
    pub async fn resolve(&self) -> &BackendHandle {
        self.resolved.get_or_init(|| self.probe_candidates()).await
    }

    /// Returns the outcome if resolution has already finished.
    pub fn resolved(&self) -> Option<&BackendHandle> {
        self.resolved.get()
    }

    async fn probe_candidates(&self) -> BackendHandle {
        for candidate in &self.candidates {
            let kind = candidate.kind();
            let label = candidate.label();

            if !self.selection.allows(kind) {
                debug!(
                    "skipping {label} backend: disabled by backend selection '{}'",
                    self.selection
                );
                continue;
            }

            debug!("probing {label} backend");
            match AssertUnwindSafe(candidate.probe()).catch_unwind().await {
                Ok(Ok(backend)) => {
                    info!(%kind, backend = backend.name(), "pointer backend selected");
                    let ops: Arc<dyn PointerBackend> = if self.serialize_input {
                        Arc::new(SerializedBackend::new(backend))
                    } else {
                        backend
                    };
                    return BackendHandle::active(kind, ops);
                }
                Ok(Err(e)) => {
                    info!("{label} backend not usable: {e}");
                }
                Err(_) => {
                    warn!("{label} backend probe panicked; trying next candidate");
                }
            }
        }

        warn!("no pointer backend available; mouse control is disabled");
        BackendHandle::unavailable()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
