//! pointer-relay library crate.
//!
//! Accepts WebSocket clients that send pointer events and applies them to the
//! local desktop through whichever input backend the host supports.
//!
//! # Architecture
//!
//! ```text
//! Client (JSON frames over WebSocket)
//!         ↕
//! [pointer-relay]
//!   ├── domain/           RelayConfig, BackendSelection
//!   ├── application/
//!   │     ├── resolver    one-time backend discovery (single-flight)
//!   │     └── session     per-connection event dispatch
//!   └── infrastructure/
//!         ├── channel     WebSocket stream → channel events
//!         ├── ws_server   accept loop, per-session tasks
//!         ├── config_file TOML configuration
//!         └── backends/   XTest / SendInput / CoreGraphics / enigo
//!         ↕
//! OS pointer state
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `pointer-core`; it never touches a
//!   socket or a platform API, so it is tested with in-memory backends.
//! - `infrastructure` owns every socket, thread and FFI call.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: backend resolution and session dispatch.
pub mod application;

/// Infrastructure layer: transport, config file and concrete backends.
pub mod infrastructure;
