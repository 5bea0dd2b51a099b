//! Serialization point in front of the shared backend.
//!
//! [`PointerBackend::move_by`] reads the pointer position and then writes a
//! new one.  Two sessions running it at the same time can both read the same
//! starting point, and the second write then silently discards the first
//! delta.  [`SerializedBackend`] holds a single-slot async lock across the
//! whole read-then-write and across clicks, so each operation lands on the
//! state the previous one left behind.
//!
//! Plain position reads do not take the lock.

use std::sync::Arc;

use async_trait::async_trait;
use pointer_core::pointer::{BackendError, MouseButton, PointerBackend, Position};
use tokio::sync::Mutex;

/// Wraps a backend so that mutating operations run one at a time.
pub struct SerializedBackend {
    inner: Arc<dyn PointerBackend>,
    gate: Mutex<()>,
}

impl SerializedBackend {
    pub fn new(inner: Arc<dyn PointerBackend>) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }
}

#[async_trait]
impl PointerBackend for SerializedBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn position(&self) -> Result<Position, BackendError> {
        self.inner.position().await
    }

    async fn move_to(&self, target: Position) -> Result<(), BackendError> {
        let _turn = self.gate.lock().await;
        self.inner.move_to(target).await
    }

    async fn click(&self, button: MouseButton) -> Result<(), BackendError> {
        let _turn = self.gate.lock().await;
        self.inner.click(button).await
    }

    async fn move_by(&self, dx: i32, dy: i32) -> Result<Position, BackendError> {
        let _turn = self.gate.lock().await;
        self.inner.move_by(dx, dy).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
