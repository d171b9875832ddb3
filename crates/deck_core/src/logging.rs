use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::DeckConfig;

/// Initializes the logging system with file + console output.
/// Returns a guard that must be kept alive for the duration of the app.
///
/// `RUST_LOG` takes precedence over the filter derived from `config`.
/// Console output goes to stderr so command output on stdout stays clean.
pub fn init_logging(config: &DeckConfig) -> Result<WorkerGuard> {
    install(&DeckConfig::logs_dir()?, &config.log_filter())
}

/// Daily-rolling `deck` file under `logs_dir` plus a compact stderr layer.
fn install(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "deck");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
