//! Structured descriptors for `ssh`, `scp` and `sshpass` invocations.
//!
//! Every external call is an argument vector, never a shell string.
//! Passwords only travel through the child environment.

use std::fmt;
use std::process::Stdio;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::plan::{Endpoint, TransferDirection, TransferRequest, Via};
use crate::config::Programs;

/// Environment variable `sshpass -e` reads.
pub const SSHPASS_VAR: &str = "SSHPASS";

/// Environment variable carrying the jump host password to the proxy.
pub const JUMP_PASSWORD_VAR: &str = "SSHGATE_JUMP_PASSWORD";

/// Host key policy: accept unknown hosts, refuse changed keys.
const HOST_KEY_OPTION: &str = "StrictHostKeyChecking=accept-new";

/// Proxy script run under `sh -c`. Positional arguments are the sshpass
/// program, the ssh program, the `-W` forward and the jump login.
const PROXY_SCRIPT: &str = "SSHPASS=$SSHGATE_JUMP_PASSWORD; export SSHPASS; \
     exec \"$1\" -e \"$2\" -o StrictHostKeyChecking=accept-new -W \"$3\" \"$4\"";

/// One external process invocation. Stdio is inherited from the terminal.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, Zeroizing<String>)>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Appends an `-o KEY=VALUE` option pair.
    pub fn option(&mut self, option: impl Into<String>) -> &mut Self {
        self.arg("-o").arg(option)
    }

    /// Sets an environment variable on the child.
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env
            .push((key.to_string(), Zeroizing::new(value.to_string())));
        self
    }

    /// Returns the value of an environment variable set on the child.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Builds the Tokio command. The child is killed if the handle drops.
    #[must_use]
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value.as_str());
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<String> = self.env.iter().map(|(k, _)| format!("{}=***", k)).collect();
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .finish()
    }
}

/// Quotes a word for a POSIX shell.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-.,/:@%+=".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Escapes `%` so ssh does not expand it as a token.
fn escape_percent(word: &str) -> String {
    word.replace('%', "%%")
}

/// Brackets IPv6 literals for `host:path` and `host:port` syntax.
fn bracket_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// `user@host`, or the host alone when no username is known.
fn login(endpoint: &Endpoint, bracket: bool) -> String {
    let host = if bracket {
        bracket_host(endpoint.host())
    } else {
        endpoint.host().to_string()
    };
    match endpoint.credential.username() {
        "" => host,
        user => format!("{}@{}", user, host),
    }
}

/// Builds command descriptors for plan steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    ssh: String,
    scp: String,
    /// `None` when no password-feeding helper is installed.
    sshpass: Option<String>,
}

impl CommandBuilder {
    #[must_use]
    pub fn new(ssh: impl Into<String>, scp: impl Into<String>, sshpass: Option<String>) -> Self {
        Self {
            ssh: ssh.into(),
            scp: scp.into(),
            sshpass,
        }
    }

    /// Uses the configured programs, checking that `sshpass` is installed.
    #[must_use]
    pub fn from_programs(programs: &Programs) -> Self {
        let sshpass = match which::which(&programs.sshpass) {
            Ok(path) => Some(path.to_string_lossy().into_owned()),
            Err(_) => {
                debug!("{} not found on PATH", programs.sshpass);
                None
            }
        };
        Self::new(&programs.ssh, &programs.scp, sshpass)
    }

    /// Interactive shell on the destination.
    #[must_use]
    pub fn interactive(&self, via: &Via) -> CommandSpec {
        let dest = via.destination();
        let mut spec = self.base(&self.ssh, dest);
        spec.option(HOST_KEY_OPTION);
        self.jump_options(&mut spec, via);
        spec.arg(login(dest, false));
        spec
    }

    /// File copy to or from the destination.
    #[must_use]
    pub fn transfer(&self, via: &Via, transfer: &TransferRequest) -> CommandSpec {
        let dest = via.destination();
        let mut spec = self.base(&self.scp, dest);
        spec.option(HOST_KEY_OPTION).arg("-r");
        self.jump_options(&mut spec, via);

        let remote = format!("{}:{}", login(dest, true), transfer.remote);
        let local = transfer.local.to_string_lossy().into_owned();
        match transfer.direction {
            TransferDirection::Upload => spec.arg(local).arg(remote),
            TransferDirection::Download => spec.arg(remote).arg(local),
        };
        spec
    }

    /// Wraps `program` in `sshpass -e` when the destination has a password.
    fn base(&self, program: &str, dest: &Endpoint) -> CommandSpec {
        match (dest.credential.secret(), self.sshpass.as_deref()) {
            (Some(password), Some(sshpass)) => {
                let mut spec = CommandSpec::new(sshpass);
                spec.arg("-e").arg(program).env(SSHPASS_VAR, password);
                spec
            }
            (Some(_), None) => {
                warn!("sshpass not installed, {} will ask for the password of '{}'", program, dest.id());
                CommandSpec::new(program)
            }
            (None, _) => CommandSpec::new(program),
        }
    }

    fn jump_options(&self, spec: &mut CommandSpec, via: &Via) {
        let Some(jump) = via.jump() else {
            return;
        };

        match (jump.credential.secret(), self.sshpass.as_deref()) {
            (Some(password), Some(sshpass)) => {
                spec.env(JUMP_PASSWORD_VAR, password);
                let proxy = self.proxy_command(sshpass, jump, via.destination());
                spec.option(format!("ProxyCommand={}", proxy));
            }
            (secret, _) => {
                if secret.is_some() {
                    warn!("sshpass not installed, jump host '{}' will ask for its password", jump.id());
                }
                spec.arg("-J").arg(login(jump, true));
            }
        }
    }

    fn proxy_command(&self, sshpass: &str, jump: &Endpoint, dest: &Endpoint) -> String {
        let word = |w: &str| escape_percent(&shell_quote(w));
        // `-W` needs IPv6 literals bracketed
        let forward = if bracket_host(dest.host()) == dest.host() {
            "%h:%p"
        } else {
            "[%h]:%p"
        };
        format!(
            "sh -c {} sshgate-proxy {} {} {} {}",
            shell_quote(PROXY_SCRIPT),
            word(sshpass),
            word(&self.ssh),
            forward,
            word(&login(jump, false))
        )
    }
}
