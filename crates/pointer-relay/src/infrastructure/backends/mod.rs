//! Pointer backend implementations.
//!
//! The native backend is selected at compile time via
//! `#[cfg(target_os = ...)]`; the automation backend and the in-memory mock
//! are available everywhere.

pub mod automation;
pub mod mock;
pub mod worker;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "linux")]
pub mod x11;

#[cfg(target_os = "macos")]
pub mod macos;

use crate::application::BackendProbe;

/// Backend candidates for this platform, highest priority first:
/// the native mechanism (if one exists for this OS), then `enigo`.
pub fn platform_candidates() -> Vec<Box<dyn BackendProbe>> {
    let mut candidates: Vec<Box<dyn BackendProbe>> = Vec::new();

    #[cfg(target_os = "linux")]
    candidates.push(Box::new(x11::XTestProbe));

    #[cfg(target_os = "windows")]
    candidates.push(Box::new(windows::SendInputProbe));

    #[cfg(target_os = "macos")]
    candidates.push(Box::new(macos::CoreGraphicsProbe));

    candidates.push(Box::new(automation::EnigoProbe));
    candidates
}
