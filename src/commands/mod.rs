//! Subcommand handlers.

pub mod add;
pub mod connect;
pub mod list;

use std::io;

use crate::cli::Commands;
use crate::config::Config;
use crate::credential::TerminalPrompter;
use crate::error::AppError;

/// Runs the selected subcommand.
pub async fn run(command: Commands, config: &Config) -> Result<(), AppError> {
    match command {
        Commands::Add(args) => add::run(config, args, &mut TerminalPrompter::new()),
        Commands::List { filter, json } => {
            list::run(config, filter.as_deref(), json, &mut io::stdout().lock())
        }
        Commands::Connect(args) => connect::run(config, args).await,
    }
}
