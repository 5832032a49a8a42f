//! Secret-first credential resolution with prompt fallback.

use tracing::{debug, info};

use super::prompt::{PromptRequest, Prompter, prompt_credential};
use super::{Credential, CredentialSource, PromptError};
use crate::registry::TargetRecord;
use crate::secret::{SecretBackend, SecretSession};
use crate::status;

/// Resolves target credentials for one run.
///
/// Secret-manager failures never escape: they are reported and the user
/// is prompted instead. The only error is a cancelled prompt.
pub struct CredentialResolver<'a, B: SecretBackend, P: Prompter + ?Sized> {
    session: &'a mut SecretSession<B>,
    prompter: &'a mut P,
}

impl<'a, B: SecretBackend, P: Prompter + ?Sized> CredentialResolver<'a, B, P> {
    /// Creates a resolver over a run's session and prompter.
    pub fn new(session: &'a mut SecretSession<B>, prompter: &'a mut P) -> Self {
        Self { session, prompter }
    }

    /// Resolves the credential for `record`.
    pub fn resolve(&mut self, record: &TargetRecord) -> Result<Credential, PromptError> {
        let default_username = match CredentialSource::for_target(record) {
            CredentialSource::BySecret {
                secret_ref,
                username,
            } => match self.session.fetch(secret_ref) {
                Ok(entry) => {
                    // The entry's username wins over the stored one
                    let username = entry
                        .username
                        .or_else(|| username.map(str::to_string));
                    match (username, entry.password) {
                        (Some(username), Some(password)) => {
                            info!("Resolved '{}' from secret '{}'", record.id, secret_ref);
                            return Ok(Credential::ByPassword { username, password });
                        }
                        (username, None) => {
                            status::warn(&format!(
                                "Secret '{}' has no password, asking for '{}' credentials",
                                secret_ref, record.id
                            ));
                            username
                        }
                        (None, Some(_)) => {
                            status::warn(&format!(
                                "No username known for '{}', asking for credentials",
                                record.id
                            ));
                            None
                        }
                    }
                }
                Err(e) => {
                    status::warn(&format!(
                        "Could not read secret '{}' ({}), asking for '{}' credentials",
                        secret_ref, e, record.id
                    ));
                    username.map(str::to_string)
                }
            },
            CredentialSource::Interactive { username } => {
                debug!("No secret reference for '{}'", record.id);
                username.map(str::to_string)
            }
        };

        let request = PromptRequest {
            target_id: record.id.clone(),
            host: record.address().to_string(),
            username: default_username,
        };
        prompt_credential(&mut *self.prompter, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::prompt::tests::ScriptedPrompter;
    use crate::secret::{BackendLogin, SecretEntry, SecretError, SessionToken};
    use zeroize::Zeroizing;

    /// Backend answering every fetch with the same result.
    struct StaticBackend {
        entry: Result<SecretEntry, SecretError>,
        fetches: u32,
    }

    impl StaticBackend {
        fn new(entry: Result<SecretEntry, SecretError>) -> Self {
            Self { entry, fetches: 0 }
        }
    }

    impl SecretBackend for StaticBackend {
        fn unlock(&mut self, _login: &BackendLogin) -> Result<SessionToken, SecretError> {
            Ok(SessionToken::new("tok"))
        }

        fn fetch(&mut self, _token: &SessionToken, _r: &str) -> Result<SecretEntry, SecretError> {
            self.fetches += 1;
            self.entry.clone()
        }

        fn lock(&mut self, _token: &SessionToken) -> Result<(), SecretError> {
            Ok(())
        }
    }

    fn login() -> Option<BackendLogin> {
        Some(BackendLogin {
            client_id: "id".to_string(),
            client_secret: Zeroizing::new("s".to_string()),
            master_password: Zeroizing::new("m".to_string()),
            server: None,
        })
    }

    fn entry(username: Option<&str>, password: Option<&str>) -> SecretEntry {
        SecretEntry {
            username: username.map(str::to_string),
            password: password.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    #[test]
    fn test_secret_used_without_prompt() {
        let mut session = SecretSession::new(
            StaticBackend::new(Ok(entry(Some("admin"), Some("pw")))),
            login(),
        );
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let record = TargetRecord::new("prod", "192.168.50.5")
            .with_username("stored")
            .with_secret_ref("prod-cred");

        let cred = CredentialResolver::new(&mut session, &mut prompter)
            .resolve(&record)
            .unwrap();

        assert_eq!(cred, Credential::password("admin", "pw"));
        assert!(prompter.labels.is_empty());
    }

    #[test]
    fn test_stored_username_fills_missing_secret_username() {
        let mut session =
            SecretSession::new(StaticBackend::new(Ok(entry(None, Some("pw")))), login());
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let record = TargetRecord::new("prod", "h")
            .with_username("stored")
            .with_secret_ref("prod-cred");

        let cred = CredentialResolver::new(&mut session, &mut prompter)
            .resolve(&record)
            .unwrap();
        assert_eq!(cred, Credential::password("stored", "pw"));
    }

    #[test]
    fn test_backend_failure_prompts_once() {
        let mut session = SecretSession::new(
            StaticBackend::new(Err(SecretError::Unreachable("down".to_string()))),
            login(),
        );
        let mut prompter = ScriptedPrompter::new(&[""], &["typed"]);
        let record = TargetRecord::new("prod", "h")
            .with_username("u")
            .with_secret_ref("prod-cred");

        let cred = CredentialResolver::new(&mut session, &mut prompter)
            .resolve(&record)
            .unwrap();

        assert_eq!(cred, Credential::password("u", "typed"));
        assert_eq!(prompter.labels.len(), 2);
    }

    #[test]
    fn test_missing_password_prompts_with_secret_username() {
        let mut session =
            SecretSession::new(StaticBackend::new(Ok(entry(Some("admin"), None))), login());
        let mut prompter = ScriptedPrompter::new(&[""], &[""]);
        let record = TargetRecord::new("prod", "h").with_secret_ref("prod-cred");

        let cred = CredentialResolver::new(&mut session, &mut prompter)
            .resolve(&record)
            .unwrap();
        assert_eq!(cred, Credential::key("admin"));
    }

    #[test]
    fn test_no_secret_ref_skips_backend() {
        let mut session = SecretSession::new(StaticBackend::new(Ok(SecretEntry::default())), None);
        let mut prompter = ScriptedPrompter::new(&[""], &["pw"]);
        let record = TargetRecord::new("jump1", "203.0.113.10").with_username("u");

        let cred = CredentialResolver::new(&mut session, &mut prompter)
            .resolve(&record)
            .unwrap();

        assert_eq!(cred, Credential::password("u", "pw"));
        assert_eq!(session.backend().fetches, 0);
        assert!(!session.is_unlocked());
    }

    #[test]
    fn test_cancelled_prompt_propagates() {
        let mut session = SecretSession::new(
            StaticBackend::new(Err(SecretError::AuthFailed("bad".to_string()))),
            login(),
        );
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let record = TargetRecord::new("prod", "h").with_secret_ref("prod-cred");

        let result = CredentialResolver::new(&mut session, &mut prompter).resolve(&record);
        assert!(matches!(result, Err(PromptError::Cancelled)));
    }
}
