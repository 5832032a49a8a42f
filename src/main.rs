//! sshgate - Main entry point.
//!
//! Usage: sshgate [-v] <add|list|connect> [OPTIONS]
//!
//! Legacy forms such as `sshgate -c prod` or `sshgate -jc prod` are
//! accepted and run `connect`.

use std::process::ExitCode;

use clap::Parser;

use sshgate::cli::{self, Cli};
use sshgate::config::Config;
use sshgate::error::AppError;
use sshgate::{commands, logging, status};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));
    status::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => return report(&AppError::from(e)),
    };

    let mut log_config = config.log_config.clone();
    log_config.verbosity = cli.verbose;
    if let Err(e) = logging::init(&log_config) {
        status::warn(&format!("File logging disabled: {}", e));
    }

    match commands::run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Prints a one-line diagnostic and returns the matching exit code.
fn report(error: &AppError) -> ExitCode {
    tracing::error!("{} failed: {}", error.stage(), error);
    status::error(&format!("{}: {}", error.stage(), error));
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
}
