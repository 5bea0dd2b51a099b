//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for runtime settings.  It is
//! assembled in `main.rs` from defaults, an optional TOML file, environment
//! variables and CLI flags (in that order of increasing precedence), then
//! wrapped in an `Arc` and shared with every session task.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use pointer_core::pointer::BackendKind;
use serde::{Deserialize, Serialize};

/// Port the relay listens on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 6969;

/// Per-session inbound queue capacity when nothing else is configured.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Which backend candidates the resolver is allowed to probe.
///
/// This only narrows the fixed priority list; at most one backend is ever
/// active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    /// Native backend first, automation library second.
    #[default]
    Auto,
    /// Only the native OS backend.
    Native,
    /// Only the automation library backend.
    Automation,
    /// Probe nothing; input is disabled.
    None,
}

impl BackendSelection {
    /// Returns `true` if a candidate of `kind` may be probed.
    pub fn allows(self, kind: BackendKind) -> bool {
        match self {
            Self::Auto => kind != BackendKind::Unavailable,
            Self::Native => kind == BackendKind::Native,
            Self::Automation => kind == BackendKind::Automation,
            Self::None => false,
        }
    }
}

impl FromStr for BackendSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "automation" => Ok(Self::Automation),
            "none" | "off" => Ok(Self::None),
            other => Err(format!(
                "unknown backend '{other}' (expected auto, native, automation or none)"
            )),
        }
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Automation => "automation",
            Self::None => "none",
        })
    }
}

/// All runtime configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Which backend candidates to probe at startup.
    pub backend: BackendSelection,

    /// Whether relative moves and clicks from different sessions are applied
    /// one at a time.
    ///
    /// With `false`, two sessions moving at the same moment can interleave the
    /// read and write halves of a relative move and lose one delta.
    pub serialize_input: bool,

    /// Capacity of each session's inbound event queue.  When full, the relay
    /// stops reading from that client's socket until the queue drains.
    pub queue_depth: usize,
}

impl Default for RelayConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:6969` |
    /// | backend         | `auto`         |
    /// | serialize_input | `true`         |
    /// | queue_depth     | `256`          |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            backend: BackendSelection::Auto,
            serialize_input: true,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
