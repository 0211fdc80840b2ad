//! File logging for `stickw`
//!
//! stdout belongs to the NDJSON event stream, so every log line goes to a
//! daily-rotated `stickwriter.log` under `<data_local_dir>/stickwriter/logs/`
//! (`~/.local/share/stickwriter/logs/` on Linux).

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV_VAR: &str = "STICKWRITER_LOG";

/// Base name of the rotated log file
pub const LOG_FILE_NAME: &str = "stickwriter.log";

/// `info` for the `stickw` binary and every `stickwriter_*` crate (targets
/// match by prefix), `warn` for dependencies
pub const DEFAULT_FILTER: &str = "stickw=info,warn";

/// Install the file subscriber for the `stickw` process
///
/// Device writes run for minutes; progress and backend command output land
/// in the log, never on stdout. Set `STICKWRITER_LOG` to override
/// [`DEFAULT_FILTER`].
///
/// # Examples
/// ```bash
/// STICKWRITER_LOG=debug stickw write disk.iso /dev/sdb
/// STICKWRITER_LOG=stickwriter_backend=trace,info stickw devices
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("Log directory: {}", log_dir.display());

    Ok(())
}

/// Falls back to `./stickwriter/logs` when the platform has no data dir
fn log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("stickwriter").join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_directory_is_app_scoped() {
        let dir = log_directory();
        assert!(dir.ends_with("stickwriter/logs"));
    }
}
