//! pointer-core: shared types for the pointer-relay workspace.
//!
//! This crate contains everything that is independent of sockets, threads and
//! operating-system APIs:
//!
//! - [`protocol`]: the client-facing event protocol (`mouseEvent` and
//!   `mouseAction` frames) and the rules for turning a raw frame into a
//!   validated [`protocol::MouseEvent`].
//! - [`pointer`]: pointer primitives ([`pointer::Position`],
//!   [`pointer::MouseButton`]) and the [`pointer::PointerBackend`] capability
//!   trait that every input-injection backend implements.
//!
//! # Layer rules
//!
//! - No `tokio`, no networking, no platform FFI.
//! - Everything here is unit-testable without a desktop session.

/// Client-facing event protocol.
pub mod protocol;

/// Pointer primitives and the backend capability trait.
pub mod pointer;
