//! Connection target records.
//!
//! A target is a named remote host entry. Its credential is either taken
//! from a secret-manager entry (`secretRef`) or entered interactively,
//! optionally pre-filled with a stored username.

use serde::{Deserialize, Serialize};

use super::RegistryError;

/// URL schemes stripped from hosts pasted from a web console.
const HOST_SCHEMES: [&str; 2] = ["https://", "http://"];

/// A saved connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Unique identifier, immutable once created.
    #[serde(alias = "entry-name")]
    pub id: String,
    /// Login name. Required when no secret entry is referenced.
    #[serde(default, alias = "ssh-username")]
    pub username: Option<String>,
    /// Hostname or IP address.
    #[serde(alias = "ip", alias = "ssh-ip", alias = "server-ip")]
    pub host: String,
    /// Name of an entry in the secret manager.
    #[serde(
        default,
        rename = "secretRef",
        alias = "bitwarden-name",
        alias = "Bitwarden-Name"
    )]
    pub secret_ref: Option<String>,
}

impl TargetRecord {
    /// Creates a record with no username and no secret entry.
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            host: host.into(),
            secret_ref: None,
        }
    }

    /// Sets the stored username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the secret-manager entry name.
    #[must_use]
    pub fn with_secret_ref(mut self, secret_ref: impl Into<String>) -> Self {
        self.secret_ref = Some(secret_ref.into());
        self
    }

    /// Returns the stored username, treating an empty string as absent.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }

    /// Returns the secret entry name, treating an empty string as absent.
    #[must_use]
    pub fn secret_ref(&self) -> Option<&str> {
        self.secret_ref.as_deref().filter(|r| !r.is_empty())
    }

    /// Returns the host with any URL scheme and trailing path removed.
    ///
    /// `https://10.0.0.5/App-Role/baseLogin` becomes `10.0.0.5`.
    #[must_use]
    pub fn address(&self) -> &str {
        let mut host = self.host.trim();
        for scheme in HOST_SCHEMES {
            if let Some(rest) = host.strip_prefix(scheme) {
                host = rest;
                break;
            }
        }
        match host.find('/') {
            Some(idx) => &host[..idx],
            None => host,
        }
    }

    /// Checks the fields every stored record must carry.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::InvalidRecord("id must not be empty".to_string()));
        }
        if self.address().is_empty() {
            return Err(RegistryError::InvalidRecord(format!(
                "host for '{}' must not be empty",
                self.id
            )));
        }
        Ok(())
    }
}

/// Ordered collection of targets with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetList {
    targets: Vec<TargetRecord>,
}

impl TargetList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates targets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetRecord> {
        self.targets.iter()
    }

    /// Looks up a target by exact id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&TargetRecord> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Returns true if a target with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Appends a target, rejecting duplicate ids.
    pub fn add(&mut self, record: TargetRecord) -> Result<(), RegistryError> {
        record.validate()?;
        if self.contains(&record.id) {
            return Err(RegistryError::DuplicateId(record.id));
        }
        self.targets.push(record);
        Ok(())
    }

    /// Removes the most recently added target. Used to roll back a failed save.
    pub(super) fn pop(&mut self) -> Option<TargetRecord> {
        self.targets.pop()
    }

    /// Returns targets whose id contains `filter` (case-insensitive).
    #[must_use]
    pub fn filter(&self, filter: &str) -> Vec<&TargetRecord> {
        let needle = filter.to_lowercase();
        self.targets
            .iter()
            .filter(|t| needle.is_empty() || t.id.to_lowercase().contains(&needle))
            .collect()
    }

    /// Returns the first id that appears more than once, if any.
    pub(super) fn first_duplicate(&self) -> Option<&str> {
        self.targets.iter().enumerate().find_map(|(i, t)| {
            self.targets[..i]
                .iter()
                .any(|earlier| earlier.id == t.id)
                .then_some(t.id.as_str())
        })
    }
}
