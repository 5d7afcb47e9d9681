//! File logging
//!
//! The CLI owns stdout for user-facing output, so diagnostics go to a
//! daily-rolling file under the XDG state directory
//! (`~/.local/state/relato/`) instead. `RUST_LOG` overrides the level
//! from `[logging]` in the config file.

use crate::config::{Config, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flushes buffered log writes when dropped.
///
/// Hold it for the life of the process; lines logged after the guard
/// drops are lost.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Route `tracing` output to the state-directory log file.
///
/// Call once, before any other component logs. Writes go through a
/// non-blocking worker so a slow disk never stalls a drain.
pub fn init(config: &LoggingConfig) -> crate::error::Result<LogGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "relato.log");
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::debug!(dir = %log_dir.display(), level = %config.level, "file logging ready");

    Ok(LogGuard { _worker: worker })
}

/// Send `tracing` output to the test harness capture instead of a file
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
