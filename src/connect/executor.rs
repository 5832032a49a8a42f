//! Runs plan steps as child processes.

use std::io;
use std::process::ExitStatus;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ConnectError;
use super::command::{CommandBuilder, CommandSpec};
use super::plan::{ConnectionPlan, Step};
use crate::interrupt::Interrupt;

/// Runs one command to completion and returns its exit code.
#[async_trait]
pub trait StepRunner: Send {
    async fn run(&mut self, spec: &CommandSpec) -> io::Result<i32>;
}

/// Runs commands as real child processes on the invoking terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn run(&mut self, spec: &CommandSpec) -> io::Result<i32> {
        let mut child = spec.to_command().spawn()?;
        let status = child.wait().await?;
        Ok(exit_code(status))
    }
}

/// Maps an exit status to a shell-style code.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Executes plans step by step.
pub struct Executor<R: StepRunner> {
    runner: R,
    builder: CommandBuilder,
    interrupt: Interrupt,
}

impl<R: StepRunner> Executor<R> {
    #[must_use]
    pub fn new(runner: R, builder: CommandBuilder, interrupt: Interrupt) -> Self {
        Self {
            runner,
            builder,
            interrupt,
        }
    }

    /// Returns the runner.
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs every step in order, stopping at the first failure.
    ///
    /// # Errors
    /// `TransferFailed`/`SessionFailed` carry the failing child's exit
    /// code. An interrupt kills the running child and yields `Cancelled`.
    pub async fn run(&mut self, plan: &ConnectionPlan) -> Result<(), ConnectError> {
        let via = plan.via();

        for step in plan.steps() {
            if self.interrupt.is_triggered() {
                return Err(ConnectError::Cancelled);
            }

            let spec = match step {
                Step::Transfer(transfer) => self.builder.transfer(via, transfer),
                Step::Interactive => self.builder.interactive(via),
            };
            info!("Running: {}", spec);

            let result = tokio::select! {
                biased;
                () = self.interrupt.triggered() => {
                    warn!("Interrupted while running {}", spec.program);
                    return Err(ConnectError::Cancelled);
                }
                result = self.runner.run(&spec) => result,
            };

            let code = result.map_err(|source| ConnectError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
            info!("{} exited with {}", spec.program, code);

            if code != 0 {
                return Err(match step {
                    Step::Transfer(_) => ConnectError::TransferFailed { code },
                    Step::Interactive => ConnectError::SessionFailed { code },
                });
            }
        }

        Ok(())
    }
}
