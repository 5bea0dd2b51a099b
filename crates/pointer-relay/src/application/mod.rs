//! Application layer for pointer-relay.
//!
//! Knows *what* happens to an event (resolve the shared backend, validate the
//! frame, call the right operation) but not *how* pointers are moved or how
//! frames arrive.  Both ends are traits or plain values, so everything here is
//! tested with in-memory backends.

pub mod resolver;
pub mod serialized;
pub mod session;

pub use resolver::{BackendHandle, BackendProbe, BackendResolver};
pub use serialized::SerializedBackend;
pub use session::{Dispatch, Session, SessionStats};
