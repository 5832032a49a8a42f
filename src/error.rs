//! Top-level error type and exit codes.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::connect::ConnectError;
use crate::credential::PromptError;
use crate::registry::RegistryError;

/// Missing or unusable configuration.
pub const EXIT_CONFIG: i32 = 3;
/// Registry lookup or storage failure.
pub const EXIT_LOOKUP: i32 = 4;
/// A step could not be executed.
pub const EXIT_EXECUTION: i32 = 5;
/// Cancelled by the user.
pub const EXIT_CANCELLED: i32 = 130;

/// Any failure a command can end with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Connect(ConnectError::Config(_)) => EXIT_CONFIG,
            Self::Registry(_) | Self::Connect(ConnectError::Registry(_)) => EXIT_LOOKUP,
            Self::Connect(ConnectError::Cancelled) | Self::Prompt(PromptError::Cancelled) => {
                EXIT_CANCELLED
            }
            Self::Connect(
                ConnectError::TransferFailed { code } | ConnectError::SessionFailed { code },
            ) => *code,
            Self::Connect(ConnectError::Prompt(_) | ConnectError::Spawn { .. })
            | Self::Prompt(PromptError::Io(_))
            | Self::Io(_)
            | Self::Json(_) => EXIT_EXECUTION,
        }
    }

    /// Names the stage that failed, for the one-line diagnostic.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Connect(ConnectError::Config(_)) => "config",
            Self::Registry(RegistryError::NotFound(_))
            | Self::Connect(ConnectError::Registry(RegistryError::NotFound(_))) => "lookup",
            Self::Registry(_) | Self::Connect(ConnectError::Registry(_)) => "registry",
            Self::Connect(ConnectError::Cancelled) | Self::Prompt(PromptError::Cancelled) => {
                "cancelled"
            }
            Self::Connect(ConnectError::TransferFailed { .. }) => "transfer",
            Self::Connect(ConnectError::SessionFailed { .. }) => "session",
            Self::Connect(ConnectError::Spawn { .. }) => "execute",
            Self::Connect(ConnectError::Prompt(_)) | Self::Prompt(PromptError::Io(_)) => "prompt",
            Self::Io(_) | Self::Json(_) => "output",
        }
    }
}
