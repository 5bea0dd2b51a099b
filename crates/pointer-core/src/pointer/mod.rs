//! Pointer primitives and the backend capability trait.
//!
//! [`PointerBackend`] is the one contract every input-injection mechanism
//! exposes, whether it talks to the OS directly or goes through an automation
//! library.  The relay picks one implementation at startup and shares it as an
//! `Arc<dyn PointerBackend>` between all client sessions.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Primitives ────────────────────────────────────────────────────────────────

/// Absolute pointer position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by `(dx, dy)`, saturating at the `i32`
    /// bounds instead of wrapping.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Buttons the relay can click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// Which backend variant a process ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Direct OS mechanism (XTest, SendInput, CoreGraphics).
    Native,
    /// Cross-platform automation library.
    Automation,
    /// Nothing could be initialised; input is disabled for the process lifetime.
    Unavailable,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Automation => "automation",
            Self::Unavailable => "unavailable",
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors raised by backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be initialised on this host (library missing,
    /// no display, permission denied).  Only seen during probing.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The OS rejected a single operation.  The backend stays usable.
    #[error("pointer operation failed: {0}")]
    Operation(String),

    /// The worker thread that owns the platform handle has exited.
    #[error("backend worker stopped")]
    WorkerStopped,
}

// ── Capability ────────────────────────────────────────────────────────────────

/// An installed mechanism able to query and move the pointer and click.
///
/// Every method may suspend.  Implementations must be shareable between
/// sessions (`Send + Sync`); platform handles that are not thread-safe are
/// kept on a dedicated worker thread by the implementation.
#[async_trait]
pub trait PointerBackend: Send + Sync {
    /// Short human-readable name used in logs, e.g. `"x11-xtest"`.
    fn name(&self) -> &'static str;

    /// Current pointer position.
    async fn position(&self) -> Result<Position, BackendError>;

    /// Moves the pointer to an absolute position.
    async fn move_to(&self, target: Position) -> Result<(), BackendError>;

    /// Synthesizes a press and release of `button` at the current position.
    async fn click(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Moves the pointer relative to where it is now.
    ///
    /// This is a read followed by a write and is **not atomic**: two callers
    /// interleaving between the two steps can lose one of the deltas.  Wrap
    /// the backend in a serializing adapter when that matters.
    async fn move_by(&self, dx: i32, dy: i32) -> Result<Position, BackendError> {
        let target = self.position().await?.offset(dx, dy);
        self.move_to(target).await?;
        Ok(target)
    }

    async fn left_click(&self) -> Result<(), BackendError> {
        self.click(MouseButton::Left).await
    }

    async fn right_click(&self) -> Result<(), BackendError> {
        self.click(MouseButton::Right).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Minimal backend that records clicks and tracks a position.
    struct Recorder {
        pos: Mutex<Position>,
        clicks: Mutex<Vec<MouseButton>>,
        fail_reads: bool,
    }

    impl Recorder {
        fn at(x: i32, y: i32) -> Self {
            Self {
                pos: Mutex::new(Position::new(x, y)),
                clicks: Mutex::new(Vec::new()),
                fail_reads: false,
            }
        }
    }

    #[async_trait]
    impl PointerBackend for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn position(&self) -> Result<Position, BackendError> {
            if self.fail_reads {
                return Err(BackendError::Operation("read denied".into()));
            }
            Ok(*self.pos.lock().unwrap())
        }

        async fn move_to(&self, target: Position) -> Result<(), BackendError> {
            *self.pos.lock().unwrap() = target;
            Ok(())
        }

        async fn click(&self, button: MouseButton) -> Result<(), BackendError> {
            self.clicks.lock().unwrap().push(button);
            Ok(())
        }
    }

    #[test]
    fn test_offset_adds_deltas() {
        assert_eq!(Position::new(10, 10).offset(5, -3), Position::new(15, 7));
    }

    #[test]
    fn test_offset_saturates_instead_of_wrapping() {
        let p = Position::new(i32::MAX - 1, i32::MIN + 1).offset(10, -10);
        assert_eq!(p, Position::new(i32::MAX, i32::MIN));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, -4).to_string(), "(3, -4)");
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Native.to_string(), "native");
        assert_eq!(BackendKind::Unavailable.to_string(), "unavailable");
    }

    #[tokio::test]
    async fn test_move_by_reads_then_writes_target() {
        // Arrange
        let backend = Recorder::at(10, 10);

        // Act
        let landed = backend.move_by(5, -3).await.unwrap();

        // Assert
        assert_eq!(landed, Position::new(15, 7));
        assert_eq!(backend.position().await.unwrap(), Position::new(15, 7));
    }

    #[tokio::test]
    async fn test_move_by_propagates_read_failure_without_moving() {
        let mut backend = Recorder::at(1, 1);
        backend.fail_reads = true;

        assert_err!(backend.move_by(1, 1).await);
        assert_eq!(*backend.pos.lock().unwrap(), Position::new(1, 1));
    }

    #[tokio::test]
    async fn test_click_helpers_map_to_buttons() {
        let backend = Recorder::at(0, 0);

        assert_ok!(backend.left_click().await);
        assert_ok!(backend.right_click().await);

        assert_eq!(
            *backend.clicks.lock().unwrap(),
            vec![MouseButton::Left, MouseButton::Right]
        );
    }
}
