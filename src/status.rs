//! User-facing status lines on stderr.
//!
//! Diagnostics go through `tracing`; these are the short progress markers
//! an operator sees while a command runs.

use colored::Colorize;

/// Disables colour when stderr is not a terminal.
pub fn init() {
    if !atty::is(atty::Stream::Stderr) {
        colored::control::set_override(false);
    }
}

/// `[*]` progress line.
pub fn info(message: &str) {
    eprintln!("{} {}", "[*]".cyan(), message);
}

/// `[+]` line for something created.
pub fn added(message: &str) {
    eprintln!("{} {}", "[+]".green(), message);
}

/// `[✓]` line for a finished step.
pub fn success(message: &str) {
    eprintln!("{} {}", "[✓]".green().bold(), message);
}

/// `[!]` warning line.
pub fn warn(message: &str) {
    eprintln!("{} {}", "[!]".yellow(), message);
}

/// `[!]` error line.
pub fn error(message: &str) {
    eprintln!("{} {}", "[!]".red().bold(), message.red());
}

/// Formats a `[?]` prompt label.
#[must_use]
pub fn question(label: &str) -> String {
    format!("{} {}", "[?]".blue(), label)
}
