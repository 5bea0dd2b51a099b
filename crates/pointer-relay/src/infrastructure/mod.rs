//! Infrastructure layer for pointer-relay.
//!
//! Everything that touches the outside world lives here:
//!
//! - Binding the listener and accepting WebSocket clients (`ws_server`)
//! - Turning a WebSocket stream into channel events (`channel`)
//! - Reading the TOML configuration file (`config_file`)
//! - Talking to the OS input APIs (`backends`)

pub mod backends;
pub mod channel;
pub mod config_file;
pub mod ws_server;

pub use ws_server::{bind, run_server, serve};
