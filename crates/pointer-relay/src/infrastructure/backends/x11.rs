//! Linux X11 pointer injection via the XTest extension.
//!
//! # What is XTest?
//!
//! XTest is an X11 protocol extension that lets a client synthesize input as
//! if it came from real hardware.  The receiving application cannot tell the
//! difference.  This backend uses two requests:
//!
//! - `QueryPointer` on the root window to read the current position.
//! - `XTestFakeInput` with `MotionNotify` (absolute move on the root window)
//!   or `ButtonPress`/`ButtonRelease` (button 1 = left, 3 = right).
//!
//! Requests go through `x11rb`, a pure-Rust X11 client, so no Xlib is needed
//! at link time.
//!
//! # Permissions
//!
//! The process must be able to open the display named by `DISPLAY`.  Without
//! it (headless host, Wayland-only session) the probe fails and the resolver
//! moves on to the next candidate.

use std::sync::Arc;

use async_trait::async_trait;
use pointer_core::pointer::{BackendError, BackendKind, MouseButton, PointerBackend, Position};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

use crate::application::BackendProbe;
use crate::infrastructure::backends::worker::{DeviceWorker, PointerDevice};

const NAME: &str = "x11-xtest";

/// X11 core protocol button numbers.
const BUTTON_LEFT: u8 = 1;
const BUTTON_RIGHT: u8 = 3;

/// Connection to the X server plus the root window all coordinates refer to.
pub struct XTestDevice {
    conn: RustConnection,
    root: xproto::Window,
}

fn unavailable(e: impl std::fmt::Display) -> BackendError {
    BackendError::Unavailable(format!("{NAME}: {e}"))
}

fn op_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::Operation(format!("{NAME}: {e}"))
}

/// X11 coordinates are 16-bit; out-of-range targets are pinned to the edge.
fn to_x11_coord(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl XTestDevice {
    /// Opens the default display and checks that XTest is present.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if the display cannot be opened
    /// or the server lacks the XTest extension.
    pub fn open() -> Result<Self, BackendError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(unavailable)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| unavailable("X server reported no screens"))?;

        conn.xtest_get_version(2, 2)
            .map_err(unavailable)?
            .reply()
            .map_err(unavailable)?;

        Ok(Self { conn, root })
    }

    fn fake_input(&self, event: u8, detail: u8, at: Option<Position>) -> Result<(), BackendError> {
        let (window, x, y) = match at {
            Some(p) => (self.root, to_x11_coord(p.x), to_x11_coord(p.y)),
            None => (x11rb::NONE, 0, 0),
        };
        self.conn
            .xtest_fake_input(event, detail, x11rb::CURRENT_TIME, window, x, y, 0)
            .map_err(op_error)?;
        self.conn.flush().map_err(op_error)
    }
}

impl PointerDevice for XTestDevice {
    fn position(&mut self) -> Result<Position, BackendError> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(op_error)?
            .reply()
            .map_err(op_error)?;
        Ok(Position::new(reply.root_x.into(), reply.root_y.into()))
    }

    fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
        // detail 0 = absolute motion.
        self.fake_input(xproto::MOTION_NOTIFY_EVENT, 0, Some(target))
    }

    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        let detail = match button {
            MouseButton::Left => BUTTON_LEFT,
            MouseButton::Right => BUTTON_RIGHT,
        };
        self.fake_input(xproto::BUTTON_PRESS_EVENT, detail, None)?;
        self.fake_input(xproto::BUTTON_RELEASE_EVENT, detail, None)
    }
}

/// Resolver candidate for the X11/XTest backend.
pub struct XTestProbe;

#[async_trait]
impl BackendProbe for XTestProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn label(&self) -> &'static str {
        NAME
    }

    async fn probe(&self) -> Result<Arc<dyn PointerBackend>, BackendError> {
        let worker = DeviceWorker::spawn(NAME, XTestDevice::open).await?;
        Ok(Arc::new(worker))
    }
}
