//! Per-run secret session lifecycle.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{BackendLogin, SecretBackend, SecretEntry, SecretError, SessionToken};

/// Lifecycle state of the session.
#[derive(Debug)]
enum SessionState {
    /// Never unlocked in this run.
    Locked,
    /// Unlocked; the token is valid until `close`.
    Unlocked(SessionToken),
    /// The single unlock attempt failed; not retried.
    Unavailable(SecretError),
    /// Torn down. Terminal.
    Closed,
}

/// Secret-manager session scoped to one run.
///
/// Unlock is memoized: the backend sees at most one unlock call per
/// session, whether it succeeds or fails. `close` locks the backend if
/// and only if it was unlocked, and runs at most once. Dropping an
/// unclosed session closes it.
pub struct SecretSession<B: SecretBackend> {
    backend: B,
    login: Option<BackendLogin>,
    state: SessionState,
    fetched: HashMap<String, Result<SecretEntry, SecretError>>,
}

impl<B: SecretBackend> SecretSession<B> {
    /// Creates a locked session.
    #[must_use]
    pub fn new(backend: B, login: Option<BackendLogin>) -> Self {
        Self {
            backend,
            login,
            state: SessionState::Locked,
            fetched: HashMap::new(),
        }
    }

    /// Returns the wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns true while the backend is unlocked.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, SessionState::Unlocked(_))
    }

    /// Returns true once the session has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    /// Unlocks the backend, reusing the token of an earlier unlock.
    pub fn unlock(&mut self) -> Result<&SessionToken, SecretError> {
        if matches!(self.state, SessionState::Locked) {
            let Some(login) = self.login.as_ref() else {
                self.state = SessionState::Unavailable(SecretError::NotConfigured);
                return Err(SecretError::NotConfigured);
            };

            info!("Unlocking secret manager");
            self.state = match self.backend.unlock(login) {
                Ok(token) => SessionState::Unlocked(token),
                Err(e) => {
                    warn!("Secret manager unlock failed: {}", e);
                    SessionState::Unavailable(e)
                }
            };
        }

        match &self.state {
            SessionState::Unlocked(token) => Ok(token),
            SessionState::Unavailable(e) => Err(e.clone()),
            SessionState::Closed => Err(SecretError::SessionClosed),
            SessionState::Locked => Err(SecretError::NotConfigured),
        }
    }

    /// Fetches an entry, unlocking first if needed.
    ///
    /// Results are memoized per reference for the rest of the run.
    pub fn fetch(&mut self, secret_ref: &str) -> Result<SecretEntry, SecretError> {
        if self.is_closed() {
            return Err(SecretError::SessionClosed);
        }
        if let Some(cached) = self.fetched.get(secret_ref) {
            debug!("Using cached result for secret '{}'", secret_ref);
            return cached.clone();
        }

        let token = self.unlock()?.clone();
        let result = self.backend.fetch(&token, secret_ref);
        match &result {
            Ok(_) => info!("Fetched credentials for secret '{}'", secret_ref),
            Err(e) => warn!("Could not fetch secret '{}': {}", secret_ref, e),
        }
        self.fetched.insert(secret_ref.to_string(), result.clone());
        result
    }

    /// Tears the session down, locking the backend if it was unlocked.
    ///
    /// Only the first call does anything.
    pub fn close(&mut self) -> Result<(), SecretError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        self.fetched.clear();

        match previous {
            SessionState::Unlocked(token) => {
                info!("Locking secret manager");
                self.backend.lock(&token)
            }
            _ => Ok(()),
        }
    }
}

impl<B: SecretBackend> Drop for SecretSession<B> {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.close() {
                warn!("Failed to lock secret manager during teardown: {}", e);
            }
        }
    }
}
