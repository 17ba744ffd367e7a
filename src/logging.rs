//! File-based logging
//!
//! Sets up tracing-based logging that writes to a daily-rotated file, so the
//! demo's console output stays readable.

use std::path::Path;

use anyhow::Context;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Logs are written to `<dir>/<file_prefix>.YYYY-MM-DD` with daily rotation.
/// The level is taken from `RUST_LOG` when set, otherwise from the configured
/// filter.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let log_dir = Path::new(&config.dir);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, &config.file_prefix);

    // Non-blocking so logging never stalls the controller task
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop; keep it for the lifetime of the process
    Box::leak(Box::new(guard));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!(dir = %log_dir.display(), "Logging initialized");

    Ok(())
}
