//! Pointer relay: entry point.
//!
//! Listens for WebSocket clients and applies their `mouseEvent` /
//! `mouseAction` messages to the local pointer through whichever input
//! backend works on this host.
//!
//! # Usage
//!
//! ```text
//! pointer-relay [OPTIONS]
//!
//! Options:
//!   --port            <PORT>   WebSocket listener port [default: 6969]
//!   --bind            <IP>     Listener address [default: 0.0.0.0]
//!   --backend         <NAME>   auto | native | automation | none [default: auto]
//!   --serialize-input <BOOL>   Apply moves/clicks one at a time [default: true]
//!   --queue-depth     <N>      Per-session event queue [default: 256]
//!   --config          <PATH>   Optional TOML config file
//! ```
//!
//! # Configuration precedence
//!
//! Built-in defaults, then the TOML file, then environment variables, then
//! CLI flags.  Each flag has an environment counterpart:
//!
//! | Variable                    | Flag                |
//! |-----------------------------|---------------------|
//! | `POINTER_RELAY_PORT`        | `--port`            |
//! | `POINTER_RELAY_BIND`        | `--bind`            |
//! | `POINTER_RELAY_BACKEND`     | `--backend`         |
//! | `POINTER_RELAY_SERIALIZE`   | `--serialize-input` |
//! | `POINTER_RELAY_QUEUE_DEPTH` | `--queue-depth`     |
//! | `POINTER_RELAY_CONFIG`      | `--config`          |
//!
//! The log level comes from `RUST_LOG` if set, otherwise from the file's
//! `[logging] level`, otherwise `info`.
//!
//! # Architecture overview
//!
//! ```text
//! Remote client  (JSON over WebSocket, port 6969)
//!       ↕
//! pointer-relay  ← this process
//!   domain/         RelayConfig, BackendSelection
//!   application/    BackendResolver (single flight), Session dispatch
//!   infrastructure/
//!     ws_server     accept loop, per-session tasks
//!     channel       WebSocket → ChannelFrame
//!     backends/     X11 / SendInput / CoreGraphics, enigo, mock
//!       ↕
//! Local pointer
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pointer_relay::application::BackendResolver;
use pointer_relay::domain::{BackendSelection, RelayConfig};
use pointer_relay::infrastructure::backends::platform_candidates;
use pointer_relay::infrastructure::config_file::FileConfig;
use pointer_relay::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote pointer relay.
///
/// Every setting is optional here so that an unset flag falls through to the
/// config file instead of overriding it with a clap default.
#[derive(Debug, Parser)]
#[command(
    name = "pointer-relay",
    about = "Drive the local mouse pointer from remote WebSocket clients",
    version
)]
struct Cli {
    /// TCP port for the WebSocket listener.
    #[arg(long, env = "POINTER_RELAY_PORT")]
    port: Option<u16>,

    /// IP address to bind the listener to.
    ///
    /// `0.0.0.0` accepts LAN clients; `127.0.0.1` restricts to this machine.
    #[arg(long, env = "POINTER_RELAY_BIND")]
    bind: Option<String>,

    /// Which input backends may be probed: auto, native, automation or none.
    #[arg(long, env = "POINTER_RELAY_BACKEND")]
    backend: Option<BackendSelection>,

    /// Apply relative moves and clicks from all sessions one at a time.
    #[arg(long, env = "POINTER_RELAY_SERIALIZE")]
    serialize_input: Option<bool>,

    /// Capacity of each session's inbound event queue.
    #[arg(long, env = "POINTER_RELAY_QUEUE_DEPTH")]
    queue_depth: Option<usize>,

    /// Path to a TOML configuration file.
    #[arg(long, env = "POINTER_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Reads the config file named by `--config`, or defaults when absent.
    fn load_file(&self) -> anyhow::Result<FileConfig> {
        match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("cannot load config file {}", path.display())),
            None => Ok(FileConfig::default()),
        }
    }

    /// Layers the CLI/env values over `file` to produce a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if either the file's or `--bind`'s address is not a
    /// valid IP address.
    fn into_relay_config(self, file: &FileConfig) -> anyhow::Result<RelayConfig> {
        let base = file.to_relay_config().context("invalid config file")?;

        let ip = match &self.bind {
            Some(bind) => bind
                .parse::<IpAddr>()
                .with_context(|| format!("invalid bind address: '{bind}'"))?,
            None => base.bind_addr.ip(),
        };
        let port = self.port.unwrap_or(base.bind_addr.port());

        Ok(RelayConfig {
            bind_addr: SocketAddr::new(ip, port),
            backend: self.backend.unwrap_or(base.backend),
            serialize_input: self.serialize_input.unwrap_or(base.serialize_input),
            queue_depth: self.queue_depth.unwrap_or(base.queue_depth),
        })
    }
}

/// `RUST_LOG` wins; otherwise the file's level; otherwise `info`.
fn log_filter(file_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(file_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the optional config file is loaded.
/// 2. `tracing_subscriber` is initialised (the file may set the level, so
///    this comes second).
/// 3. A [`BackendResolver`] is built over this platform's candidates and
///    resolution is kicked off in the background, so the first client does
///    not pay for probing.
/// 4. A Ctrl+C handler clears the shared `running` flag.
/// 5. [`run_server`] binds the port and serves clients until the flag is
///    cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Flags and env vars first; the file they point at is read right after.
    let cli = Cli::parse();
    let file = cli.load_file()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    // Initialise once, here.  Calling `init()` a second time would panic.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&file.logging.level))
        .init();

    // CLI/env values win over the file; the file wins over built-in defaults.
    let config = cli.into_relay_config(&file)?;

    info!(
        bind = %config.bind_addr,
        backend = %config.backend,
        serialize_input = config.serialize_input,
        "pointer relay starting"
    );

    // ── Backend resolution ────────────────────────────────────────────────────
    let resolver = Arc::new(BackendResolver::new(
        platform_candidates(),
        config.backend,
        config.serialize_input,
    ));

    // Sessions that arrive before this finishes simply join the same probe.
    let eager = Arc::clone(&resolver);
    tokio::spawn(async move {
        eager.resolve().await;
    });

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    // The accept loop polls this flag; clearing it stops new connections.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    // Blocks until the flag is cleared or the listener cannot be bound.
    run_server(config, resolver, running).await?;

    info!("pointer relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        let mut full = vec!["pointer-relay"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_parses_all_flags() {
        // Arrange / Act
        let cli = parse_args(&[
            "--port",
            "7000",
            "--bind",
            "127.0.0.1",
            "--backend",
            "automation",
            "--serialize-input",
            "false",
            "--queue-depth",
            "8",
        ]);

        // Assert
        assert_eq!(cli.port, Some(7000));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.backend, Some(BackendSelection::Automation));
        assert_eq!(cli.serialize_input, Some(false));
        assert_eq!(cli.queue_depth, Some(8));
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        let result = Cli::try_parse_from(["pointer-relay", "--backend", "robot"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_without_flags_or_file() {
        // Arrange
        let cli = Cli {
            port: None,
            bind: None,
            backend: None,
            serialize_input: None,
            queue_depth: None,
            config: None,
        };

        // Act
        let config = cli.into_relay_config(&FileConfig::default()).unwrap();

        // Assert
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:6969");
        assert_eq!(config.backend, BackendSelection::Auto);
        assert!(config.serialize_input);
        assert_eq!(config.queue_depth, 256);
    }

    #[test]
    fn test_file_values_apply_when_flags_absent() {
        // Arrange
        let file = FileConfig::from_toml_str(
            "[server]\nbind_address = \"127.0.0.1\"\nport = 7100\n[input]\nbackend = \"native\"\n",
        )
        .unwrap();
        let cli = Cli {
            port: None,
            bind: None,
            backend: None,
            serialize_input: None,
            queue_depth: None,
            config: None,
        };

        // Act
        let config = cli.into_relay_config(&file).unwrap();

        // Assert
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7100");
        assert_eq!(config.backend, BackendSelection::Native);
    }

    #[test]
    fn test_flags_override_file_values() {
        let file = FileConfig::from_toml_str(
            "[server]\nport = 7100\nqueue_depth = 4\n[input]\nserialize = true\n",
        )
        .unwrap();
        let cli = Cli {
            port: Some(7200),
            bind: Some("10.0.0.5".to_string()),
            backend: Some(BackendSelection::None),
            serialize_input: Some(false),
            queue_depth: Some(32),
            config: None,
        };

        let config = cli.into_relay_config(&file).unwrap();

        assert_eq!(config.bind_addr.to_string(), "10.0.0.5:7200");
        assert_eq!(config.backend, BackendSelection::None);
        assert!(!config.serialize_input);
        assert_eq!(config.queue_depth, 32);
    }

    #[test]
    fn test_invalid_bind_flag_returns_error() {
        // Arrange
        let cli = Cli {
            port: None,
            bind: Some("not.an.ip".to_string()),
            backend: None,
            serialize_input: None,
            queue_depth: None,
            config: None,
        };

        // Act
        let result = cli.into_relay_config(&FileConfig::default());

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = Cli {
            port: None,
            bind: None,
            backend: None,
            serialize_input: None,
            queue_depth: None,
            config: Some(PathBuf::from("/definitely/not/here/pointer-relay.toml")),
        };

        assert!(cli.load_file().is_err());
    }

    #[test]
    fn test_no_config_flag_loads_defaults() {
        // Arrange
        let cli = Cli {
            port: None,
            bind: None,
            backend: None,
            serialize_input: None,
            queue_depth: None,
            config: None,
        };

        // Act
        let file = cli.load_file().unwrap();

        // Assert
        assert_eq!(file, FileConfig::default());
    }
}
