//! macOS pointer injection via CoreGraphics events.
//!
//! # How it works
//!
//! 1. `CGEventSource::new(HIDSystemState)` gives an event source that looks
//!    like hardware input.
//! 2. `CGEvent::new(source).location()` reads the current cursor position
//!    (a null event carries the live location).
//! 3. `CGEvent::new_mouse_event(...)` builds a move or button event, and
//!    `post(CGEventTapLocation::HID)` injects it.
//!
//! # Permissions
//!
//! Posting at the HID tap requires the Accessibility permission
//! (System Settings → Privacy & Security → Accessibility).  Without it the
//! events are silently discarded by the OS, so the probe cannot detect the
//! missing grant; it only fails when no event source can be created at all.

#![cfg(target_os = "macos")]

use std::sync::Arc;

use async_trait::async_trait;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use pointer_core::pointer::{BackendError, BackendKind, MouseButton, PointerBackend, Position};

use crate::application::BackendProbe;
use crate::infrastructure::backends::worker::{DeviceWorker, PointerDevice};

const NAME: &str = "coregraphics";

/// CoreGraphics event source; not `Send`, so it lives on the worker thread.
pub struct CoreGraphicsDevice {
    source: CGEventSource,
}

fn op_error(what: &str) -> BackendError {
    BackendError::Operation(format!("{NAME}: {what} failed"))
}

impl CoreGraphicsDevice {
    /// Creates the HID-state event source.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if CoreGraphics refuses to
    /// create it (no window server session).
    pub fn open() -> Result<Self, BackendError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|()| BackendError::Unavailable(format!("{NAME}: no event source")))?;
        Ok(Self { source })
    }

    fn post_mouse(
        &self,
        kind: CGEventType,
        at: CGPoint,
        button: CGMouseButton,
    ) -> Result<(), BackendError> {
        let event = CGEvent::new_mouse_event(self.source.clone(), kind, at, button)
            .map_err(|()| op_error("CGEventCreateMouseEvent"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn location(&self) -> Result<CGPoint, BackendError> {
        CGEvent::new(self.source.clone())
            .map(|event| event.location())
            .map_err(|()| op_error("CGEventCreate"))
    }
}

impl PointerDevice for CoreGraphicsDevice {
    fn position(&mut self) -> Result<Position, BackendError> {
        let at = self.location()?;
        Ok(Position::new(at.x.round() as i32, at.y.round() as i32))
    }

    fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
        let at = CGPoint::new(f64::from(target.x), f64::from(target.y));
        self.post_mouse(CGEventType::MouseMoved, at, CGMouseButton::Left)
    }

    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        let (down, up, cg_button) = match button {
            MouseButton::Left => (
                CGEventType::LeftMouseDown,
                CGEventType::LeftMouseUp,
                CGMouseButton::Left,
            ),
            MouseButton::Right => (
                CGEventType::RightMouseDown,
                CGEventType::RightMouseUp,
                CGMouseButton::Right,
            ),
        };
        // Button events carry a location; use where the cursor is now.
        let at = self.location()?;
        self.post_mouse(down, at, cg_button)?;
        self.post_mouse(up, at, cg_button)
    }
}

/// Resolver candidate for the CoreGraphics backend.
pub struct CoreGraphicsProbe;

#[async_trait]
impl BackendProbe for CoreGraphicsProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn label(&self) -> &'static str {
        NAME
    }

    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError> {
        let worker = DeviceWorker::spawn(NAME, CoreGraphicsDevice::open).await?;
        Ok(Arc::new(worker))
    }
}
