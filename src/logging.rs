//! Tracing subscriber setup.
//!
//! `CODEXREF_LOG` (falling back to `RUST_LOG`) takes the usual filter syntax,
//! e.g. `debug` or `codexref::generator=trace`. Without either, progress is
//! logged at `info`. `CODEXREF_LOG_FORMAT=json` switches to one JSON object
//! per event. Everything goes to stderr; stdout is kept for command output.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Filter used when no environment variable is set.
const DEFAULT_FILTER: &str = "codexref=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Newline-delimited JSON objects.
    Json,
    /// Flat text lines.
    Text,
}

impl LogFormat {
    /// Parse from `CODEXREF_LOG_FORMAT`.
    fn from_env() -> Self {
        return Self::parse(&std::env::var("CODEXREF_LOG_FORMAT").unwrap_or_default());
    }

    fn parse(value: &str) -> Self {
        return match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        };
    }
}

/// `CODEXREF_LOG`, then `RUST_LOG`, then the default.
fn build_filter() -> EnvFilter {
    if let Ok(value) = std::env::var("CODEXREF_LOG") {
        return EnvFilter::builder().parse_lossy(value);
    }
    if let Ok(value) = std::env::var("RUST_LOG") {
        return EnvFilter::builder().parse_lossy(value);
    }
    return EnvFilter::new(DEFAULT_FILTER);
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let filter = build_filter();
    let installed = match LogFormat::from_env() {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(layer).try_init()
        },
        LogFormat::Text => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            Registry::default().with(filter).with(layer).try_init()
        },
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
