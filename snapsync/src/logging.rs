//! Logging setup.
//!
//! Two fmt layers share one `EnvFilter`: a non-blocking file layer under the
//! log directory and a compact stderr layer that only shows warnings unless
//! verbose. `RUST_LOG` takes precedence over the verbosity flag.

use std::path::Path;

use time::format_description::well_known::Rfc3339;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{SyncError, SyncResult};

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "snapsync.log";

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "snapsync=debug,info"
    } else {
        "snapsync=info,warn"
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init_logging(log_dir: &Path, verbose: bool) -> SyncResult<LogGuard> {
    std::fs::create_dir_all(log_dir).map_err(|e| SyncError::file_op("create_dir", log_dir, e))?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(LocalTime::new(Rfc3339));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN });

    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| SyncError::Config(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directive(verbose)).is_ok());
        }
    }

    #[test]
    fn test_init_logging_creates_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("logs");

        // Another test may have installed a subscriber already.
        let _guard = init_logging(&dir, true);

        assert!(dir.is_dir());
    }
}
