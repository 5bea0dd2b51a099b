//! Windows pointer injection via `GetCursorPos`, `SetCursorPos` and
//! `SendInput`.
//!
//! Moves use `SetCursorPos` with plain desktop coordinates, which avoids the
//! [0, 65535] normalisation `MOUSEEVENTF_ABSOLUTE` would need on multi-monitor
//! setups.  Clicks are a down/up `MOUSEINPUT` pair submitted in one
//! `SendInput` call so nothing can be interleaved between them.

#![cfg(target_os = "windows")]

use std::sync::Arc;

use async_trait::async_trait;
use pointer_core::pointer::{BackendError, BackendKind, MouseButton, PointerBackend, Position};
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, SetCursorPos};

use crate::application::BackendProbe;
use crate::infrastructure::backends::worker::{DeviceWorker, PointerDevice};

const NAME: &str = "win32-sendinput";

/// Stateless handle; the Win32 calls act on the calling thread's desktop.
pub struct SendInputDevice;

impl SendInputDevice {
    /// Verifies that the cursor can be read from this process.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] when there is no interactive
    /// desktop (service session, locked workstation).
    pub fn open() -> Result<Self, BackendError> {
        let mut device = Self;
        device
            .position()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(device)
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

impl PointerDevice for SendInputDevice {
    fn position(&mut self) -> Result<Position, BackendError> {
        let mut point = POINT::default();
        // SAFETY: `point` is a valid, writable POINT on the stack.
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| BackendError::Operation(format!("{NAME}: GetCursorPos: {e}")))?;
        Ok(Position::new(point.x, point.y))
    }

    fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
        // SAFETY: plain value arguments, no pointers involved.
        unsafe { SetCursorPos(target.x, target.y) }
            .map_err(|e| BackendError::Operation(format!("{NAME}: SetCursorPos: {e}")))
    }

    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        let (down, up) = match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
        };
        let inputs = [mouse_input(down), mouse_input(up)];

        // SAFETY: `inputs` is a valid slice of INPUT structures on the stack.
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(BackendError::Operation(format!(
                "{NAME}: SendInput injected {sent} of {} events (blocked by UIPI?)",
                inputs.len()
            )));
        }
        Ok(())
    }
}

/// Resolver candidate for the Win32 backend.
pub struct SendInputProbe;

#[async_trait]
impl BackendProbe for SendInputProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn label(&self) -> &'static str {
        NAME
    }

    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError> {
        let worker = DeviceWorker::spawn(NAME, SendInputDevice::open).await?;
        Ok(Arc::new(worker))
    }
}
