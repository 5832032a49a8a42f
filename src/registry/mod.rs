//! Connection target registry.
//!
//! Holds every saved target for the lifetime of the process. The file is
//! read once on open and written back only when a target is added.

pub mod storage;
pub mod target;

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

pub use storage::RegistryStorage;
pub use target::{TargetList, TargetRecord};

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The registry file is not a well-formed target list.
    #[error("registry file {} is corrupt: {source}", path.display())]
    StorageCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error while writing.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// File too large.
    #[error("registry file too large (max 1MB)")]
    FileTooLarge,

    /// A target with this id already exists.
    #[error("target '{0}' already exists")]
    DuplicateId(String),

    /// No target with this id.
    #[error("target '{0}' not found")]
    NotFound(String),

    /// A record is missing a required field.
    #[error("invalid target: {0}")]
    InvalidRecord(String),
}

/// In-memory registry backed by a file.
#[derive(Debug)]
pub struct Registry {
    storage: RegistryStorage,
    targets: TargetList,
}

impl Registry {
    /// Opens the registry at `path`, loading existing targets.
    pub fn open(path: PathBuf) -> Result<Self, RegistryError> {
        Self::load(RegistryStorage::with_path(path))
    }

    /// Loads the registry from the given storage.
    pub fn load(storage: RegistryStorage) -> Result<Self, RegistryError> {
        let targets = storage.load()?;
        Ok(Self { storage, targets })
    }

    /// Returns all targets.
    #[must_use]
    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.storage.path()
    }

    /// Looks up a target by id.
    pub fn find(&self, id: &str) -> Result<&TargetRecord, RegistryError> {
        self.targets
            .find(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Returns true if a target with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains(id)
    }

    /// Adds a target and persists the full registry.
    ///
    /// On a failed write the in-memory registry is left unchanged.
    pub fn add(&mut self, record: TargetRecord) -> Result<(), RegistryError> {
        let id = record.id.clone();
        self.targets.add(record)?;

        if let Err(e) = self.storage.save(&self.targets) {
            self.targets.pop();
            return Err(e);
        }

        info!("Added target '{}' to {}", id, self.storage.path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_add_find() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");

        let mut registry = Registry::open(path.clone()).unwrap();
        assert!(registry.targets().is_empty());

        registry
            .add(TargetRecord::new("prod", "192.168.50.5").with_secret_ref("prod-cred"))
            .unwrap();
        assert_eq!(registry.find("prod").unwrap().host, "192.168.50.5");

        let reopened = Registry::open(path).unwrap();
        assert!(reopened.contains("prod"));
    }

    #[test]
    fn test_find_missing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("servers.json")).unwrap();
        assert!(matches!(
            registry.find("ghost"),
            Err(RegistryError::NotFound(ref id)) if id == "ghost"
        ));
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        let mut registry = Registry::open(path.clone()).unwrap();
        registry.add(TargetRecord::new("a", "h1")).unwrap();

        let before = std::fs::read_to_string(&path).unwrap();
        let err = registry.add(TargetRecord::new("a", "h2")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(registry.targets().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_save_rolls_back() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("ro");
        std::fs::create_dir(&sub).unwrap();
        let mut registry = Registry::open(sub.join("servers.json")).unwrap();

        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o500)).unwrap();
        let result = registry.add(TargetRecord::new("a", "h"));
        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o700)).unwrap();

        // Running as root bypasses directory permissions
        if result.is_err() {
            assert!(registry.targets().is_empty());
        }
    }
}
