//! sshgate
//!
//! Connects to saved SSH targets, optionally through a jump host, with
//! credentials taken from a Bitwarden vault or typed at a prompt.
//!
//! # Architecture
//!
//! - **Registry**: saved targets in a JSON file, written atomically
//! - **Secret**: Bitwarden session unlocked at most once per run and
//!   always locked again
//! - **Credential**: secret-first resolution with prompt fallback
//! - **Connect**: planning, `ssh`/`scp`/`sshpass` command descriptors
//!   and step execution
//!
//! # Usage
//!
//! ```no_run
//! use sshgate::registry::Registry;
//!
//! let registry = Registry::open("servers.json".into()).expect("Failed to open registry");
//! for target in registry.targets().iter() {
//!     println!("{} {}", target.id, target.address());
//! }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod connect;
pub mod credential;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod registry;
pub mod secret;
pub mod status;

// Re-export main types
pub use config::Config;
pub use connect::{ConnectError, ConnectRequest, run_connect};
pub use credential::{Credential, CredentialResolver};
pub use error::AppError;
pub use registry::{Registry, TargetRecord};
pub use secret::{SecretBackend, SecretSession};
