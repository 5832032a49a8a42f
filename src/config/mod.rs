//! Configuration module for sshgate.
//!
//! Settings come from the process environment and an optional
//! `<home>/.env` file, read once at startup. Process variables take
//! precedence over the file.

pub mod env_file;

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::logging::LogConfig;
use crate::registry::storage::DEFAULT_FILE_NAME;
use crate::secret::BackendLogin;

/// Home directory variable.
pub const HOME_VAR: &str = "SSHGATE_HOME";
/// Home directory variable used by older installs.
pub const LEGACY_HOME_VAR: &str = "SSH_SCRIPT_HOME";
/// Home directory name under the user's home.
const DEFAULT_HOME_DIR: &str = ".sshgate";
/// Env file name inside the home directory.
pub const ENV_FILE_NAME: &str = ".env";

pub const CLIENT_ID_KEY: &str = "BW_CLIENTID";
pub const CLIENT_SECRET_KEY: &str = "BW_CLIENTSECRET";
pub const MASTER_PASSWORD_KEY: &str = "BW_PASSWORD";
pub const SERVER_KEY: &str = "BW_SERVER";
pub const JUMP_KEY: &str = "JUMP_SERVER_ENTRY";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required values are absent.
    #[error("missing configuration: {}", keys.join(", "))]
    Missing { keys: Vec<&'static str> },

    /// No home directory could be determined.
    #[error("cannot determine home directory; set SSHGATE_HOME")]
    NoHome,

    /// The env file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// External programs invoked by sshgate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub ssh: String,
    pub scp: String,
    pub sshpass: String,
    pub bw: String,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            scp: "scp".to_string(),
            sshpass: "sshpass".to_string(),
            bw: "bw".to_string(),
        }
    }
}

/// Secret-manager login values, each optional until needed.
#[derive(Clone, Default)]
pub struct SecretSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<Zeroizing<String>>,
    pub master_password: Option<Zeroizing<String>>,
    pub server: Option<String>,
}

impl std::fmt::Debug for SecretSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("master_password", &self.master_password.as_ref().map(|_| "***"))
            .field("server", &self.server)
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Home directory holding the registry, env file and logs.
    pub home: PathBuf,
    /// Registry file path.
    pub servers_file: PathBuf,
    /// Secret-manager login values.
    pub secret: SecretSettings,
    /// Default jump target id.
    pub default_jump: Option<String>,
    /// External program names or paths.
    pub programs: Programs,
    /// Logging configuration.
    pub log_config: LogConfig,
}

impl Config {
    /// Returns the home directory from the environment, or `~/.sshgate`.
    pub fn home_dir() -> Result<PathBuf, ConfigError> {
        for var in [HOME_VAR, LEGACY_HOME_VAR] {
            if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
                return Ok(PathBuf::from(value));
            }
        }
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_HOME_DIR))
            .ok_or(ConfigError::NoHome)
    }

    /// Loads configuration from the process environment and `<home>/.env`.
    ///
    /// # Errors
    /// Returns error if no home directory is known or the env file
    /// exists but cannot be read.
    pub fn load() -> Result<Self, ConfigError> {
        let home = Self::home_dir()?;
        let env_path = home.join(ENV_FILE_NAME);
        let mut values = env_file::read(&env_path).map_err(|source| ConfigError::Io {
            path: env_path,
            source,
        })?;

        // Process environment wins over the file
        values.extend(unicode_vars(std::env::vars_os()));
        Ok(Self::from_sources(home, &values))
    }

    /// Builds configuration from already merged values.
    #[must_use]
    pub fn from_sources(home: PathBuf, values: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let servers_file = get("SERVERS_FILE")
            .or_else(|| get("SERVERS_LOCAL_FILE"))
            .map_or_else(|| home.join(DEFAULT_FILE_NAME), |file| home.join(file));

        let secret = SecretSettings {
            client_id: get(CLIENT_ID_KEY),
            client_secret: get(CLIENT_SECRET_KEY).map(Zeroizing::new),
            master_password: get(MASTER_PASSWORD_KEY).map(Zeroizing::new),
            server: get(SERVER_KEY),
        };

        let defaults = Programs::default();
        let programs = Programs {
            ssh: get("SSHGATE_SSH").unwrap_or(defaults.ssh),
            scp: get("SSHGATE_SCP").unwrap_or(defaults.scp),
            sshpass: get("SSHGATE_SSHPASS").unwrap_or(defaults.sshpass),
            bw: get("SSHGATE_BW").unwrap_or(defaults.bw),
        };

        let mut log_config = LogConfig {
            dir: home.join("logs"),
            ..LogConfig::default()
        };
        if let Some(level) = get("SSHGATE_LOG_LEVEL") {
            log_config.level = LogConfig::parse_level(&level);
        }
        if let Some(hours) = get("SSHGATE_LOG_RETENTION_HOURS") {
            log_config.retention_hours = LogConfig::parse_retention(&hours);
        }
        if let Some(enabled) = get("SSHGATE_LOG_ENABLED") {
            log_config.enabled = LogConfig::parse_enabled(&enabled, true);
        }

        Self {
            servers_file,
            secret,
            default_jump: get(JUMP_KEY),
            programs,
            log_config,
            home,
        }
    }

    /// Returns the secret-manager login, or the names of absent values.
    pub fn secret_login(&self) -> Result<BackendLogin, ConfigError> {
        let s = &self.secret;
        match (&s.client_id, &s.client_secret, &s.master_password) {
            (Some(client_id), Some(client_secret), Some(master_password)) => Ok(BackendLogin {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                master_password: master_password.clone(),
                server: s.server.clone(),
            }),
            _ => {
                let mut keys = Vec::new();
                if s.client_id.is_none() {
                    keys.push(CLIENT_ID_KEY);
                }
                if s.client_secret.is_none() {
                    keys.push(CLIENT_SECRET_KEY);
                }
                if s.master_password.is_none() {
                    keys.push(MASTER_PASSWORD_KEY);
                }
                Err(ConfigError::Missing { keys })
            }
        }
    }

    /// Returns the default jump target id.
    pub fn jump_target(&self) -> Result<&str, ConfigError> {
        self.default_jump
            .as_deref()
            .ok_or(ConfigError::Missing {
                keys: vec![JUMP_KEY],
            })
    }
}

/// Keeps the variables whose name and value are both valid Unicode.
fn unicode_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter().filter_map(|(key, value)| {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!("Ignoring non-Unicode value of {}", key);
                None
            }
            (Err(_), _) => None,
        }
    })
}
