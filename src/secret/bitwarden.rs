//! Bitwarden CLI (`bw`) secret backend.
//!
//! Login secrets are handed to `bw` through its documented environment
//! variables (`BW_CLIENTID`, `BW_CLIENTSECRET`, `BW_PASSWORD`,
//! `BW_SESSION`) so they never show up in a process listing.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{BackendLogin, SecretBackend, SecretEntry, SecretError, SessionToken};

/// Default program name looked up on `PATH`.
const BW_PROGRAM: &str = "bw";

/// Maximum characters of stderr kept in error messages.
const MAX_ERROR_LEN: usize = 200;

/// Item JSON as printed by `bw get item`.
#[derive(Debug, Deserialize)]
struct BwItem {
    login: Option<BwLogin>,
}

#[derive(Debug, Deserialize)]
struct BwLogin {
    username: Option<String>,
    password: Option<String>,
}

/// Which operation produced a failure, for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Login,
    Unlock,
    Fetch,
    Lock,
}

/// Secret backend driving the Bitwarden CLI.
#[derive(Debug, Clone)]
pub struct BitwardenCli {
    program: Option<PathBuf>,
}

impl BitwardenCli {
    /// Locates `bw` on `PATH`, or uses `program` when given.
    ///
    /// A missing binary is not an error here; every operation then
    /// reports the backend as unreachable.
    #[must_use]
    pub fn new(program: Option<&str>) -> Self {
        let program = which::which(program.unwrap_or(BW_PROGRAM)).ok();
        if program.is_none() {
            debug!("bw executable not found");
        }
        Self { program }
    }

    fn command(&self, args: &[&str]) -> Result<Command, SecretError> {
        let Some(ref program) = self.program else {
            return Err(SecretError::Unreachable(
                "bw executable not found on PATH".to_string(),
            ));
        };
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(cmd)
    }

    fn run(mut cmd: Command, phase: Phase) -> Result<Output, SecretError> {
        let output = cmd
            .output()
            .map_err(|e| SecretError::Unreachable(format!("failed to run bw: {}", e)))?;

        debug!("bw {:?} exited with {:?}", phase, output.status.code());
        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(phase, &stderr))
        }
    }

    fn is_logged_in(&self) -> Result<bool, SecretError> {
        let mut cmd = self.command(&["login", "--check"])?;
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let status = cmd
            .status()
            .map_err(|e| SecretError::Unreachable(format!("failed to run bw: {}", e)))?;
        Ok(status.success())
    }

    fn configure_server(&self, server: &str) {
        // Only allowed while logged out; a failure just means it is already set.
        match self
            .command(&["config", "server", server])
            .and_then(|cmd| Self::run(cmd, Phase::Login))
        {
            Ok(_) => debug!("bw server set to {}", server),
            Err(e) => debug!("bw config server skipped: {}", e),
        }
    }

    fn sync(&self, token: &SessionToken) {
        let result = self.command(&["sync"]).and_then(|mut cmd| {
            cmd.env("BW_SESSION", token.expose());
            Self::run(cmd, Phase::Fetch)
        });
        if let Err(e) = result {
            warn!("bw sync failed, vault may be stale: {}", e);
        }
    }
}

impl SecretBackend for BitwardenCli {
    fn unlock(&mut self, login: &BackendLogin) -> Result<SessionToken, SecretError> {
        if let Some(ref server) = login.server {
            self.configure_server(server);
        }

        if self.is_logged_in()? {
            debug!("bw already logged in");
        } else {
            let mut cmd = self.command(&["login", "--apikey", "--quiet"])?;
            cmd.env("BW_CLIENTID", &login.client_id)
                .env("BW_CLIENTSECRET", login.client_secret.as_str());
            Self::run(cmd, Phase::Login)?;
            debug!("bw logged in with API key");
        }

        let mut cmd = self.command(&["unlock", "--raw", "--passwordenv", "BW_PASSWORD"])?;
        cmd.env("BW_PASSWORD", login.master_password.as_str());
        let output = Self::run(cmd, Phase::Unlock)?;

        let raw = Zeroizing::new(String::from_utf8_lossy(&output.stdout).trim().to_string());
        if raw.is_empty() {
            return Err(SecretError::AuthFailed("bw unlock returned no session key".to_string()));
        }
        let token = SessionToken::new(raw.as_str());

        // Pull changes made since the last login
        self.sync(&token);
        Ok(token)
    }

    fn fetch(&mut self, token: &SessionToken, secret_ref: &str) -> Result<SecretEntry, SecretError> {
        let mut cmd = self.command(&["get", "item", secret_ref])?;
        cmd.env("BW_SESSION", token.expose());
        let output = Self::run(cmd, Phase::Fetch).map_err(|e| match e {
            SecretError::SecretNotFound(_) => SecretError::SecretNotFound(secret_ref.to_string()),
            other => other,
        })?;

        let stdout = Zeroizing::new(String::from_utf8_lossy(&output.stdout).into_owned());
        parse_item(&stdout)
    }

    fn lock(&mut self, token: &SessionToken) -> Result<(), SecretError> {
        let mut cmd = self.command(&["lock"])?;
        cmd.env("BW_SESSION", token.expose());
        Self::run(cmd, Phase::Lock).map(|_| ())
    }
}

/// Extracts the login fields from `bw get item` output.
fn parse_item(json: &str) -> Result<SecretEntry, SecretError> {
    let item: BwItem = serde_json::from_str(json)
        .map_err(|e| SecretError::Unreachable(format!("unexpected bw output: {}", e)))?;

    let login = item.login.unwrap_or(BwLogin {
        username: None,
        password: None,
    });
    Ok(SecretEntry {
        username: login.username.filter(|u| !u.is_empty()),
        password: login.password.filter(|p| !p.is_empty()).map(Zeroizing::new),
    })
}

/// Maps `bw` stderr to an error kind.
fn classify_failure(phase: Phase, stderr: &str) -> SecretError {
    let message: String = stderr.trim().chars().take(MAX_ERROR_LEN).collect();
    let lower = message.to_lowercase();

    if lower.contains("not found") || lower.contains("more than one result") {
        return SecretError::SecretNotFound(message);
    }
    if lower.contains("invalid master password")
        || lower.contains("username or password is incorrect")
        || lower.contains("invalid_client")
        || lower.contains("client_id")
        || lower.contains("client_secret")
        || lower.contains("invalid api key")
    {
        return SecretError::AuthFailed(message);
    }
    if lower.contains("not logged in") || lower.contains("vault is locked") {
        return match phase {
            Phase::Fetch | Phase::Lock => SecretError::Unreachable(message),
            Phase::Login | Phase::Unlock => SecretError::AuthFailed(message),
        };
    }

    let message = if message.is_empty() {
        "bw exited with an error".to_string()
    } else {
        message
    };
    SecretError::Unreachable(message)
}
