//! Client-facing event protocol.
//!
//! A client sends named events over its channel.  Two names are recognised:
//!
//! | Event name    | Payload                                        |
//! |---------------|------------------------------------------------|
//! | `mouseEvent`  | `{"event":"move","dx":<int>,"dy":<int>}`       |
//! | `mouseAction` | `{"action":"left_click" \| "right_click"}`     |
//!
//! Anything else is dropped without an error; the protocol is fire-and-forget
//! and has no way to report problems back to the client.

pub mod messages;

pub use messages::{
    ChannelFrame, FrameError, MouseAction, MouseEvent, MOUSE_ACTION_NAME, MOUSE_EVENT_NAME,
};
