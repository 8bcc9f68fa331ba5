//! File logging, enabled with the `DEBUG` environment variable.
//!
//! The terminal belongs to the UI, so nothing is ever logged to stdout/stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "debug.log";

/// True when `DEBUG` is set to a non-empty value
pub fn debug_enabled() -> bool {
    std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty())
}

/// Append logs to `dir/debug.log`. Returns None when logging is off.
/// Keep the guard alive until exit so buffered lines are flushed.
pub fn init(enabled: bool, dir: &Path) -> Option<WorkerGuard> {
    if !enabled {
        return None;
    }

    let writer = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(writer);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mark=debug"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }

    Some(guard)
}
