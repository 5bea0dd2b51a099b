//! Cross-platform automation backend via `enigo`.
//!
//! Second in priority: used when the native mechanism for the platform is
//! missing or refuses to start.  `enigo` picks its own platform path (X11 or
//! libei on Linux, SendInput on Windows, CoreGraphics on macOS), so this
//! backend mostly matters on hosts where the direct native probe fails for a
//! reason `enigo` can work around.

use std::sync::Arc;

use async_trait::async_trait;
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use pointer_core::pointer::{BackendError, BackendKind, MouseButton, PointerBackend, Position};

use crate::application::BackendProbe;
use crate::infrastructure::backends::worker::{DeviceWorker, PointerDevice};

const NAME: &str = "enigo";

/// `enigo` connection, owned by its worker thread.
pub struct EnigoDevice {
    enigo: Enigo,
}

impl EnigoDevice {
    /// Connects to the platform input system.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if `enigo` cannot establish a
    /// connection (no display server, missing permissions).
    pub fn open() -> Result<Self, BackendError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| BackendError::Unavailable(format!("enigo: {e}")))?;
        Ok(Self { enigo })
    }
}

fn op_error(e: enigo::InputError) -> BackendError {
    BackendError::Operation(format!("enigo: {e}"))
}

impl PointerDevice for EnigoDevice {
    fn position(&mut self) -> Result<Position, BackendError> {
        let (x, y) = self.enigo.location().map_err(op_error)?;
        Ok(Position::new(x, y))
    }

    fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
        self.enigo
            .move_mouse(target.x, target.y, Coordinate::Abs)
            .map_err(op_error)
    }

    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        self.enigo.button(button, Direction::Click).map_err(op_error)
    }
}

/// Resolver candidate for the automation backend.
pub struct EnigoProbe;

#[async_trait]
impl BackendProbe for EnigoProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Automation
    }

    fn label(&self) -> &'static str {
        NAME
    }

    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError> {
        let worker = DeviceWorker::spawn(NAME, EnigoDevice::open).await?;
        Ok(Arc::new(worker))
    }
}
