//! Credentials for connection targets.
//!
//! A target's stored fields describe where its credential comes from
//! ([`CredentialSource`]). Resolution turns that into one concrete
//! [`Credential`] before planning: a password to feed to the transport,
//! or a username alone when the transport authenticates with keys.

pub mod prompt;
pub mod resolver;

use std::fmt;
use std::io;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::registry::TargetRecord;

pub use prompt::{
    PromptRequest, Prompter, TerminalPrompter, ask_optional, ask_required, prompt_credential,
};
pub use resolver::CredentialResolver;

/// Errors from interactive prompting.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The user aborted input (Ctrl-C or end of input).
    #[error("cancelled by user")]
    Cancelled,

    /// Terminal I/O failed.
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Where a target's credential comes from, before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource<'a> {
    /// A secret-manager entry, with the stored username as fallback.
    BySecret {
        secret_ref: &'a str,
        username: Option<&'a str>,
    },
    /// Interactive entry, pre-filled with the stored username.
    Interactive { username: Option<&'a str> },
}

impl<'a> CredentialSource<'a> {
    /// Returns the source described by a record's fields.
    #[must_use]
    pub fn for_target(record: &'a TargetRecord) -> Self {
        match record.secret_ref() {
            Some(secret_ref) => Self::BySecret {
                secret_ref,
                username: record.username(),
            },
            None => Self::Interactive {
                username: record.username(),
            },
        }
    }
}

/// A resolved credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Username and password, fed to the transport non-interactively.
    ByPassword {
        username: String,
        password: Zeroizing<String>,
    },
    /// Username only; the transport uses key-based authentication.
    ByKey { username: String },
}

impl Credential {
    /// Creates a password credential.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::ByPassword {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Creates a key-only credential.
    #[must_use]
    pub fn key(username: impl Into<String>) -> Self {
        Self::ByKey {
            username: username.into(),
        }
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::ByPassword { username, .. } | Self::ByKey { username } => username,
        }
    }

    /// Returns the password, if any.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        match self {
            Self::ByPassword { password, .. } => Some(password.as_str()),
            Self::ByKey { .. } => None,
        }
    }

    /// Returns true when no password needs feeding.
    #[must_use]
    pub fn is_key_only(&self) -> bool {
        matches!(self, Self::ByKey { .. })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByPassword { username, .. } => f
                .debug_struct("ByPassword")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::ByKey { username } => {
                f.debug_struct("ByKey").field("username", username).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_for_target() {
        let record = TargetRecord::new("prod", "h").with_secret_ref("prod-cred");
        assert_eq!(
            CredentialSource::for_target(&record),
            CredentialSource::BySecret {
                secret_ref: "prod-cred",
                username: None
            }
        );

        let record = TargetRecord::new("jump1", "h").with_username("u");
        assert_eq!(
            CredentialSource::for_target(&record),
            CredentialSource::Interactive { username: Some("u") }
        );
    }

    #[test]
    fn test_credential_accessors() {
        let cred = Credential::password("root", "pw");
        assert_eq!(cred.username(), "root");
        assert_eq!(cred.secret(), Some("pw"));
        assert!(!cred.is_key_only());
        assert!(!format!("{:?}", cred).contains("\"pw\""));

        let cred = Credential::key("deploy");
        assert_eq!(cred.secret(), None);
        assert!(cred.is_key_only());
    }
}
