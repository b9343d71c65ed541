//! Logging configuration using the tracing ecosystem.
//!
//! Output goes to a daily-rotated file so it never mixes with the issue
//! listing printed on stdout.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "jira_walker=info,warn";

/// Initialize the logging system.
///
/// Logs are written to `<data_local_dir>/jira-walker/logs/jira-walker.log.<date>`.
/// The level comes from `RUST_LOG` (e.g. `RUST_LOG=jira_walker=debug` to see
/// every page fetch), defaulting to `jira_walker=info,warn`.
///
/// # Errors
///
/// Returns an error if:
/// - The log directory cannot be determined or created
/// - The tracing subscriber cannot be set
pub fn init() -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "jira-walker.log");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jira-walker starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("jira-walker").join("logs"))
}

/// Where log files are written, for display to users.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        let dir = get_log_directory().unwrap();
        assert!(dir.ends_with("jira-walker/logs"));
    }

    #[test]
    fn test_log_directory_public_function() {
        let dir = log_directory();
        assert!(dir.unwrap().ends_with("jira-walker/logs"));
    }
}
