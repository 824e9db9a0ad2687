//! Structured logging setup.
//!
//! Initialization for the `tracing` ecosystem: console output on stderr so
//! stdout stays reserved for command output, level selection from CLI flags
//! or `KILNBOX_LOG_LEVEL`, and `RUST_LOG` taking over filtering entirely when
//! set. Initialization is guarded by a `Once` and may be called repeatedly.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Environment variable consulted when no CLI flag selects a level.
pub const LOG_LEVEL_VAR: &str = "KILNBOX_LOG_LEVEL";

/// Parses a log level from a string (case-insensitive).
///
/// Returns `Level::INFO` for unrecognized input, after telling the user on
/// stderr which levels exist.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Resolves the effective level from CLI flags and the environment.
///
/// Precedence: explicit `--log-level`, then `--verbose` / `--quiet`, then
/// `KILNBOX_LOG_LEVEL`, then INFO.
pub fn level_from_args(log_level: Option<&str>, verbose: bool, quiet: bool) -> Level {
    if let Some(level_str) = log_level {
        parse_level(level_str)
    } else if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        let level_str = env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    }
}

/// Initializes the tracing subscriber at the given level.
///
/// Subsequent calls are ignored. When `RUST_LOG` is set it controls the
/// filter on its own; otherwise the crate logs at `level` and the HTTP stack
/// is held to warnings.
pub fn init(level: Level) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("kilnbox={}", level).parse().unwrap())
                .add_directive("h2=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}
