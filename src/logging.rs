// src/logging.rs
//! Console logging for the point map binary.
//!
//! Filtered by `RUST_LOG` when set, otherwise by the level passed in.
//! Output goes to stderr so the binary's own report stays on stdout.

use crate::error::{MapError, Result};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "info";

/// `RUST_LOG` if it parses, `default_level` otherwise
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(console_layer)
        .try_init()
        .map_err(|e| MapError::Other(format!("Failed to initialize logging: {}", e)))
}
