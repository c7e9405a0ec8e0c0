//! Tracing subscriber setup for the binary and for tests that want log output.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{LinkError, Result};

/// Installs a global `fmt` subscriber filtered by `level` (any `EnvFilter` directive string).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| LinkError::Config(format!("Invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| LinkError::Config("Logging already initialized".into()))
}
