//! Secret-manager access.
//!
//! A [`SecretBackend`] is the opaque unlock/fetch/lock capability of an
//! external password manager. [`SecretSession`] wraps it with the per-run
//! lifecycle: unlock at most once, fetch any number of entries, lock
//! exactly once when the run ends.

pub mod bitwarden;
pub mod session;

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

pub use bitwarden::BitwardenCli;
pub use session::SecretSession;

/// Errors reported by a secret backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The backend rejected the login or master password.
    #[error("secret manager authentication failed: {0}")]
    AuthFailed(String),

    /// No entry matches the reference.
    #[error("secret '{0}' not found")]
    SecretNotFound(String),

    /// The backend could not be reached or failed unexpectedly.
    #[error("secret manager unreachable: {0}")]
    Unreachable(String),

    /// No login values were configured for the backend.
    #[error("secret manager login not configured")]
    NotConfigured,

    /// The session was already locked for this run.
    #[error("secret session already closed")]
    SessionClosed,
}

/// Login values used to unlock the backend.
#[derive(Clone)]
pub struct BackendLogin {
    /// API client id.
    pub client_id: String,
    /// API client secret.
    pub client_secret: Zeroizing<String>,
    /// Vault master password.
    pub master_password: Zeroizing<String>,
    /// Self-hosted server URL, if any.
    pub server: Option<String>,
}

impl fmt::Debug for BackendLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendLogin")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("master_password", &"***")
            .field("server", &self.server)
            .finish()
    }
}

/// Opaque handle returned by a successful unlock.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// Wraps a raw session key.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    /// Returns the raw session key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Login fields of a fetched secret entry. Either may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretEntry {
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
}

impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Unlock/fetch/lock capability of an external secret manager.
pub trait SecretBackend {
    /// Authenticates and returns a session token.
    fn unlock(&mut self, login: &BackendLogin) -> Result<SessionToken, SecretError>;

    /// Fetches the login fields of a named entry.
    fn fetch(&mut self, token: &SessionToken, secret_ref: &str)
    -> Result<SecretEntry, SecretError>;

    /// Invalidates the session.
    fn lock(&mut self, token: &SessionToken) -> Result<(), SecretError>;
}
