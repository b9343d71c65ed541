//! jira-walker - list, count and show JIRA issues from the terminal.

use std::process::ExitCode;

use clap::Parser;

use jira_walker::cli::{self, Cli};
use jira_walker::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("warning: logging disabled: {}", e);
    }

    let result = cli::run(cli);
    tracing::info!("jira-walker shutting down");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("hint: {}", action);
            }
            if let Some(dir) = logging::log_directory().filter(|_| e.is_critical()) {
                eprintln!("logs: {}", dir.display());
            }
            ExitCode::FAILURE
        }
    }
}
