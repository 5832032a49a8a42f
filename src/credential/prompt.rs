//! Line-oriented terminal prompting.

use std::io::{self, BufRead, Write};

use zeroize::Zeroizing;

use super::{Credential, PromptError};
use crate::interrupt::Interrupt;

/// Reads answers from the user.
pub trait Prompter {
    /// Reads one line of visible input, without the line terminator.
    fn read_line(&mut self, label: &str) -> Result<String, PromptError>;

    /// Reads one line of masked input.
    fn read_secret(&mut self, label: &str) -> Result<Zeroizing<String>, PromptError>;
}

/// Prompter on the controlling terminal.
///
/// Labels go to stderr so stdout stays clean for piping.
#[derive(Debug, Default)]
pub struct TerminalPrompter {
    interrupt: Option<Interrupt>,
}

impl TerminalPrompter {
    /// Creates a prompter that is not interrupt aware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a prompter that reports `Cancelled` once Ctrl-C was pressed.
    #[must_use]
    pub fn with_interrupt(interrupt: Interrupt) -> Self {
        Self {
            interrupt: Some(interrupt),
        }
    }

    fn check_interrupt(&self) -> Result<(), PromptError> {
        match self.interrupt {
            Some(ref i) if i.is_triggered() => Err(PromptError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, label: &str) -> Result<String, PromptError> {
        self.check_interrupt()?;

        let mut stderr = io::stderr();
        write!(stderr, "{}", label)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        self.check_interrupt()?;
        if read == 0 {
            // End of input
            return Err(PromptError::Cancelled);
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&mut self, label: &str) -> Result<Zeroizing<String>, PromptError> {
        self.check_interrupt()?;

        let secret = match rpassword::prompt_password(label) {
            Ok(s) => Zeroizing::new(s),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(PromptError::Cancelled);
            }
            Err(e) => return Err(e.into()),
        };

        self.check_interrupt()?;
        Ok(secret)
    }
}

/// Asks until a non-empty answer is given.
///
/// Only end of input or an interrupt ends the loop, as `Cancelled`.
pub fn ask_required<P: Prompter + ?Sized>(
    prompter: &mut P,
    label: &str,
) -> Result<String, PromptError> {
    loop {
        let answer = prompter.read_line(label)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

/// Asks once; an empty answer means `None`.
pub fn ask_optional<P: Prompter + ?Sized>(
    prompter: &mut P,
    label: &str,
) -> Result<Option<String>, PromptError> {
    let answer = prompter.read_line(label)?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// What a credential prompt is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub target_id: String,
    pub host: String,
    /// Username offered as the default answer.
    pub username: Option<String>,
}

/// Prompts once for a target's username and password.
///
/// An empty password yields a key-only credential.
pub fn prompt_credential<P: Prompter + ?Sized>(
    prompter: &mut P,
    request: &PromptRequest,
) -> Result<Credential, PromptError> {
    let label = match request.username {
        Some(ref default) => format!(
            "Username for {} ({}) [{}]: ",
            request.target_id, request.host, default
        ),
        None => format!("Username for {} ({}): ", request.target_id, request.host),
    };

    let username = match request.username {
        Some(ref default) => ask_optional(prompter, &label)?.unwrap_or_else(|| default.clone()),
        None => ask_required(prompter, &label)?,
    };

    let password = prompter.read_secret(&format!(
        "Password for {}@{} (empty for key auth): ",
        username, request.host
    ))?;

    if password.is_empty() {
        Ok(Credential::key(username))
    } else {
        Ok(Credential::ByPassword { username, password })
    }
}
