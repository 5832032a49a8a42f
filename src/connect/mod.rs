//! Connection orchestration.
//!
//! A run looks up the target (and jump host), checks that the secret
//! manager is configured if it will be needed, resolves credentials,
//! plans and executes. The secret session is closed on every exit path,
//! and a failure to close never replaces the run's own result.

pub mod command;
pub mod executor;
pub mod plan;

use std::io;

use thiserror::Error;
use tracing::{info, warn};

pub use command::{CommandBuilder, CommandSpec, shell_quote};
pub use executor::{Executor, ProcessRunner, StepRunner};
pub use plan::{
    ConnectionPlan, Endpoint, Lookup, PlanRequest, Planner, Step, TransferDirection,
    TransferRequest, Via,
};

use crate::config::{Config, ConfigError};
use crate::credential::{CredentialResolver, PromptError, Prompter};
use crate::registry::{Registry, RegistryError};
use crate::secret::{SecretBackend, SecretSession};
use crate::status;

/// Errors that end a connection run.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Target lookup or registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Required configuration is absent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The user interrupted the run.
    #[error("cancelled by user")]
    Cancelled,

    /// Prompting failed on the terminal.
    #[error("terminal error: {0}")]
    Prompt(#[source] io::Error),

    /// The transfer step exited nonzero.
    #[error("file transfer failed with exit code {code}")]
    TransferFailed { code: i32 },

    /// The interactive session exited nonzero.
    #[error("remote session ended with exit code {code}")]
    SessionFailed { code: i32 },

    /// A step's program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl From<PromptError> for ConnectError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::Cancelled => Self::Cancelled,
            PromptError::Io(e) => Self::Prompt(e),
        }
    }
}

/// What the user asked to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub target_id: String,
    /// Route through the configured default jump host.
    pub via_jump: bool,
    pub transfer: Option<TransferRequest>,
}

/// Runs one connection attempt and tears the secret session down.
///
/// # Errors
/// Returns the first failure of the run. Teardown failures are logged.
pub async fn run_connect<B, P, R>(
    config: &Config,
    registry: &Registry,
    session: &mut SecretSession<B>,
    prompter: &mut P,
    executor: &mut Executor<R>,
    request: &ConnectRequest,
) -> Result<(), ConnectError>
where
    B: SecretBackend,
    P: Prompter + ?Sized,
    R: StepRunner,
{
    let result = connect(config, registry, session, prompter, executor, request).await;

    if let Err(e) = session.close() {
        warn!("Failed to lock secret manager: {}", e);
        status::warn(&format!("Could not lock the secret manager: {}", e));
    }

    match result {
        Ok(()) => info!("Connection run to '{}' finished", request.target_id),
        Err(ref e) => warn!("Connection run to '{}' failed: {}", request.target_id, e),
    }
    result
}

async fn connect<B, P, R>(
    config: &Config,
    registry: &Registry,
    session: &mut SecretSession<B>,
    prompter: &mut P,
    executor: &mut Executor<R>,
    request: &ConnectRequest,
) -> Result<(), ConnectError>
where
    B: SecretBackend,
    P: Prompter + ?Sized,
    R: StepRunner,
{
    let jump_id = if request.via_jump {
        Some(config.jump_target()?.to_string())
    } else {
        None
    };
    let plan_request = PlanRequest {
        target_id: request.target_id.clone(),
        jump_id,
        transfer: request.transfer.clone(),
    };

    let planner = Planner::new(registry);
    let lookup = planner.lookup(&plan_request)?;
    if lookup.needs_secrets() {
        config.secret_login()?;
    }

    let plan = {
        let mut resolver = CredentialResolver::new(session, prompter);
        planner.build(&lookup, plan_request.transfer, &mut resolver)?
    };

    let dest = plan.via().destination();
    match plan.via().jump() {
        Some(jump) => status::info(&format!(
            "Connecting to {} ({}) via {} ({})",
            dest.id(),
            dest.host(),
            jump.id(),
            jump.host()
        )),
        None => status::info(&format!("Connecting to {} ({})", dest.id(), dest.host())),
    }

    executor.run(&plan).await
}
