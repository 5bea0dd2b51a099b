//! In-memory pointer backend for tests.
//!
//! # Why a mock backend?
//!
//! The real backends move the cursor of whatever desktop the tests run on (or
//! fail outright on a headless CI box).  [`MockPointer`] keeps the pointer
//! position in memory and records every click, so session and server tests
//! can assert exactly what reached the backend.
//!
//! # Exposing the relative-move race
//!
//! [`MockPointer::with_yield_between_read_and_write`] makes `position()`
//! yield to the scheduler after reading.  Two unserialized `move_by` calls
//! then reliably interleave, which is how the lost-update tests reproduce the
//! race.
//!
//! # `fail_operations`
//!
//! While set, every operation returns [`BackendError::Operation`].
//!
//! [`MockProbe`] wraps a mock (or a scripted failure) as a resolver
//! candidate and counts how often it was probed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pointer_core::pointer::{BackendError, BackendKind, MouseButton, PointerBackend, Position};

use crate::application::BackendProbe;

/// Records pointer operations without touching the OS.
#[derive(Default)]
pub struct MockPointer {
    position: Mutex<Position>,
    clicks: Mutex<Vec<MouseButton>>,
    moves: Mutex<Vec<Position>>,
    should_fail: AtomicBool,
    yield_after_read: bool,
}

impl MockPointer {
    /// Pointer at `(0, 0)`, no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer starting at `(x, y)`.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            position: Mutex::new(Position::new(x, y)),
            ..Self::default()
        }
    }

    /// Yield to the scheduler between reading and writing the position.
    pub fn with_yield_between_read_and_write(mut self) -> Self {
        self.yield_after_read = true;
        self
    }

    /// Makes every subsequent operation fail (or succeed again).
    pub fn fail_operations(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Current in-memory pointer position.
    pub fn current(&self) -> Position {
        *lock(&self.position)
    }

    /// Every click received so far, in order.
    pub fn clicks(&self) -> Vec<MouseButton> {
        lock(&self.clicks).clone()
    }

    /// Every absolute move target received so far, in order.
    pub fn moves(&self) -> Vec<Position> {
        lock(&self.moves).clone()
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(BackendError::Operation("mock failure".into()));
        }
        Ok(())
    }
}

/// Poison-tolerant lock: a panicking test thread must not cascade into others.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PointerBackend for MockPointer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn position(&self) -> Result<Position, BackendError> {
        self.check()?;
        let pos = self.current();
        if self.yield_after_read {
            tokio::task::yield_now().await;
        }
        Ok(pos)
    }

    async fn move_to(&self, target: Position) -> Result<(), BackendError> {
        self.check()?;
        *lock(&self.position) = target;
        lock(&self.moves).push(target);
        Ok(())
    }

    async fn click(&self, button: MouseButton) -> Result<(), BackendError> {
        self.check()?;
        lock(&self.clicks).push(button);
        Ok(())
    }
}

// ── Probe ─────────────────────────────────────────────────────────────────────

/// A resolver candidate backed by a [`MockPointer`] or a scripted failure.
pub struct MockProbe {
    kind: BackendKind,
    backend: Option<Arc<MockPointer>>,
    probes: Arc<AtomicUsize>,
}

impl MockProbe {
    /// A candidate that initialises successfully and yields `backend`.
    pub fn ready(kind: BackendKind, backend: Arc<MockPointer>) -> Self {
        Self {
            kind,
            backend: Some(backend),
            probes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A candidate whose initialisation always fails.
    pub fn failing(kind: BackendKind) -> Self {
        Self {
            kind,
            backend: None,
            probes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of how many times this candidate was probed.
    pub fn probe_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.probes)
    }
}

#[async_trait]
impl BackendProbe for MockProbe {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn label(&self) -> &'static str {
        "mock"
    }

    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match &self.backend {
            Some(backend) => Ok(Arc::clone(backend) as Arc<dyn PointerBackend>),
            None => Err(BackendError::Unavailable("mock candidate disabled".into())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
