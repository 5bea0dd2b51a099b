//! Domain layer for pointer-relay.
//!
//! Plain configuration types.  Nothing here reads files, environment
//! variables or sockets; `main.rs` and the infrastructure layer populate them.

pub mod config;

pub use config::{BackendSelection, RelayConfig};
