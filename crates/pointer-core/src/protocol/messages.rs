//! Event frames and the validated mouse events they carry.
//!
//! # Frame shapes
//!
//! A client sends one named event per WebSocket text frame.  Two JSON shapes
//! are accepted so that both plain WebSocket clients and emit-style clients
//! can talk to the relay without an adapter:
//!
//! ```json
//! {"name":"mouseEvent","data":{"event":"move","dx":5,"dy":-3}}
//! ["mouseAction",{"action":"left_click"}]
//! ```
//!
//! # Validation
//!
//! Turning a [`ChannelFrame`] into a [`MouseEvent`] never fails loudly.
//! [`MouseEvent::from_frame`] returns `None` for:
//!
//! - an unknown event name,
//! - a `mouseEvent` whose `event` is not `"move"`,
//! - a move without both `dx` and `dy`, or with deltas that are not JSON
//!   numbers, or that fall outside the `i32` range,
//! - a `mouseAction` whose `action` is not `"left_click"` or `"right_click"`.
//!
//! The caller drops such frames silently.
//!
//! Fractional deltas (touch pads often send `2.6` or `5.0`) are rounded down
//! to whole pixels.  Adding `floor(d)` to an integer position lands on the
//! same pixel as truncating `position + d` on screen.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Event name for relative pointer motion.
pub const MOUSE_EVENT_NAME: &str = "mouseEvent";

/// Event name for button actions.
pub const MOUSE_ACTION_NAME: &str = "mouseAction";

/// The only `event` value of a `mouseEvent` payload that has an effect.
const MOVE_EVENT: &str = "move";

// ── Frame ─────────────────────────────────────────────────────────────────────

/// Why a text frame could not be read as a named event.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame is JSON but carries no string event name.
    #[error("frame has no event name")]
    MissingName,

    /// The frame is a JSON scalar rather than an object or array.
    #[error("unsupported frame shape")]
    UnsupportedShape,
}

/// A named event with an arbitrary JSON payload, as delivered by the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Event name, e.g. `"mouseEvent"`.
    pub name: String,
    /// Event payload.  `Null` when the client sent none.
    #[serde(default)]
    pub data: Value,
}

impl ChannelFrame {
    /// Creates a frame from a name and payload.
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Parses a text frame in either the object or the emit-array shape.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the text is not JSON, is a JSON scalar, or has
    /// no string name.
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(mut map) => {
                let name = match map.remove("name") {
                    Some(Value::String(name)) => name,
                    _ => return Err(FrameError::MissingName),
                };
                let data = map.remove("data").unwrap_or(Value::Null);
                Ok(Self { name, data })
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(FrameError::MissingName),
                };
                let data = items.next().unwrap_or(Value::Null);
                Ok(Self { name, data })
            }
            _ => Err(FrameError::UnsupportedShape),
        }
    }

    /// Serializes the frame in the object shape.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidJson`] if serialization fails.
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Mouse events ──────────────────────────────────────────────────────────────

/// A button action requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    LeftClick,
    RightClick,
}

impl MouseAction {
    /// Maps a wire string to an action; unknown strings yield `None`.
    pub fn from_wire(action: &str) -> Option<Self> {
        match action {
            "left_click" => Some(Self::LeftClick),
            "right_click" => Some(Self::RightClick),
            _ => None,
        }
    }

    /// Returns the wire string for this action.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::LeftClick => "left_click",
            Self::RightClick => "right_click",
        }
    }
}

/// A validated inbound event.  Exactly one shape per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    /// Relative pointer motion.
    Move { dx: i32, dy: i32 },
    /// Synthesize a click at the current pointer position.
    Action(MouseAction),
}

/// Loose view of a `mouseEvent` payload; missing fields are checked after
/// deserialization so that a partial payload is ignored rather than rejected
/// with an error.
#[derive(Debug, Deserialize)]
struct MoveEventPayload {
    event: Option<String>,
    dx: Option<f64>,
    dy: Option<f64>,
}

/// Whole-pixel delta for a JSON number, or `None` if it does not fit `i32`.
fn pixel_delta(raw: f64) -> Option<i32> {
    let whole = raw.floor();
    let in_range = whole >= f64::from(i32::MIN) && whole <= f64::from(i32::MAX);
    (whole.is_finite() && in_range).then_some(whole as i32)
}

#[derive(Debug, Deserialize)]
struct ActionPayload {
    action: Option<String>,
}

impl MouseEvent {
    /// Validates a frame.  Returns `None` for anything that should be ignored.
    pub fn from_frame(frame: &ChannelFrame) -> Option<Self> {
        match frame.name.as_str() {
            MOUSE_EVENT_NAME => {
                let payload = MoveEventPayload::deserialize(&frame.data).ok()?;
                if payload.event.as_deref() != Some(MOVE_EVENT) {
                    return None;
                }
                Some(Self::Move {
                    dx: pixel_delta(payload.dx?)?,
                    dy: pixel_delta(payload.dy?)?,
                })
            }
            MOUSE_ACTION_NAME => {
                let payload = ActionPayload::deserialize(&frame.data).ok()?;
                MouseAction::from_wire(payload.action.as_deref()?).map(Self::Action)
            }
            _ => None,
        }
    }

    /// Builds the frame a client would send for this event.
    pub fn to_frame(&self) -> ChannelFrame {
        match self {
            Self::Move { dx, dy } => ChannelFrame::new(
                MOUSE_EVENT_NAME,
                serde_json::json!({ "event": MOVE_EVENT, "dx": dx, "dy": dy }),
            ),
            Self::Action(action) => ChannelFrame::new(
                MOUSE_ACTION_NAME,
                serde_json::json!({ "action": action.as_wire() }),
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
