//! `connect`: run one connection attempt against real tools.

use crate::cli::ConnectArgs;
use crate::config::Config;
use crate::connect::{CommandBuilder, Executor, ProcessRunner, run_connect};
use crate::credential::TerminalPrompter;
use crate::error::AppError;
use crate::interrupt::Interrupt;
use crate::registry::Registry;
use crate::secret::{BitwardenCli, SecretSession};
use crate::status;

/// Connects using `ssh`/`scp`, Bitwarden and the terminal.
pub async fn run(config: &Config, args: ConnectArgs) -> Result<(), AppError> {
    let request = args.into_request();
    let registry = Registry::open(config.servers_file.clone())?;

    // Ctrl-C now unwinds through teardown instead of killing the process
    let interrupt = Interrupt::listen();

    let backend = BitwardenCli::new(Some(config.programs.bw.as_str()));
    let mut session = SecretSession::new(backend, config.secret_login().ok());
    let mut prompter = TerminalPrompter::with_interrupt(interrupt.clone());
    let mut executor = Executor::new(
        ProcessRunner,
        CommandBuilder::from_programs(&config.programs),
        interrupt,
    );

    run_connect(
        config,
        &registry,
        &mut session,
        &mut prompter,
        &mut executor,
        &request,
    )
    .await?;

    status::success(&format!("Finished with '{}'", request.target_id));
    Ok(())
}
