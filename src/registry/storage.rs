//! Persistent storage for the target registry.
//!
//! The registry file is a pretty-printed JSON array. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! original, so a crash mid-write never leaves a truncated registry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::RegistryError;
use super::target::TargetList;

/// Maximum file size for the registry file (1MB).
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Registry file name inside the application home.
pub const DEFAULT_FILE_NAME: &str = "servers.json";

/// Loads and saves the registry file.
#[derive(Debug, Clone)]
pub struct RegistryStorage {
    /// Path to the registry file.
    path: PathBuf,
}

impl RegistryStorage {
    /// Creates a storage manager for the given path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the target list.
    ///
    /// A missing or blank file is an empty registry (first run).
    pub fn load(&self) -> Result<TargetList, RegistryError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Registry file {} not found, starting empty", self.path.display());
                return Ok(TargetList::new());
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() > MAX_FILE_SIZE {
            return Err(RegistryError::FileTooLarge);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(TargetList::new());
        }

        let targets: TargetList =
            serde_json::from_str(&content).map_err(|source| RegistryError::StorageCorrupt {
                path: self.path.clone(),
                source,
            })?;

        if let Some(id) = targets.first_duplicate() {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }

        debug!("Loaded {} target(s) from {}", targets.len(), self.path.display());
        Ok(targets)
    }

    /// Saves the full target list, replacing the file atomically.
    pub fn save(&self, targets: &TargetList) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut content = serde_json::to_string_pretty(targets)?;
        content.push('\n');

        let temp_path = self.temp_path();
        let written = Self::write_file(&temp_path, content.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!("Could not remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(e.into());
        }

        debug!("Saved {} target(s) to {}", targets.len(), self.path.display());
        Ok(())
    }

    /// Writes `bytes` to a file that is private to the owner on Unix
    /// before any content lands in it.
    fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;

        // The mode only applies on creation; a leftover temp file keeps its own
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
                warn!("Could not restrict permissions of {}: {}", path.display(), e);
            }
        }

        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TargetRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RegistryStorage::with_path(dir.path().join("nonexistent.json"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, "  \n").unwrap();
        assert!(RegistryStorage::with_path(path).load().unwrap().is_empty());
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("servers.json");
        let storage = RegistryStorage::with_path(path.clone());

        let mut targets = TargetList::new();
        targets
            .add(TargetRecord::new("jump1", "203.0.113.10").with_username("u"))
            .unwrap();
        targets
            .add(TargetRecord::new("prod", "192.168.50.5").with_secret_ref("prod-cred"))
            .unwrap();

        storage.save(&targets).unwrap();
        assert!(!dir.path().join("nested").join("servers.json.tmp").exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, targets);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        let storage = RegistryStorage::with_path(path.clone());
        storage.save(&TargetList::new()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_is_restricted_before_rename() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        let stale = dir.path().join("servers.json.tmp");
        fs::write(&stale, "leftover").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        let storage = RegistryStorage::with_path(path.clone());
        let mut targets = TargetList::new();
        targets.add(TargetRecord::new("lab", "10.1.1.1")).unwrap();
        storage.save(&targets).unwrap();

        assert!(!stale.exists());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.load().unwrap(), targets);
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_file_is_private_from_creation() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("servers.json.tmp");
        RegistryStorage::write_file(&temp, b"[]\n").unwrap();

        let mode = fs::metadata(&temp).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, "{ not json").unwrap();

        let err = RegistryStorage::with_path(path).load().unwrap_err();
        assert!(matches!(err, RegistryError::StorageCorrupt { .. }));
    }

    #[test]
    fn test_object_instead_of_array_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, r#"{"id": "a", "host": "b"}"#).unwrap();

        let err = RegistryStorage::with_path(path).load().unwrap_err();
        assert!(matches!(err, RegistryError::StorageCorrupt { .. }));
    }

    #[test]
    fn test_duplicate_ids_in_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(
            &path,
            r#"[{"id": "a", "host": "h1"}, {"id": "a", "host": "h2"}]"#,
        )
        .unwrap();

        let err = RegistryStorage::with_path(path).load().unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(ref id) if id == "a"));
    }

    #[test]
    fn test_parse_legacy_file_format() {
        // Format written by the old shell helpers
        let content = r#"[
    {
        "entry-name": "jump1",
        "ip": "203.0.113.10",
        "ssh-username": "u"
    },
    {
        "entry-name": "prod",
        "ip": "https://192.168.50.5/App-Role/baseLogin",
        "bitwarden-name": "prod-cred"
    }
]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, content).unwrap();

        let targets = RegistryStorage::with_path(path).load().unwrap();
        assert_eq!(targets.len(), 2);

        let prod = targets.find("prod").unwrap();
        assert_eq!(prod.address(), "192.168.50.5");
        assert_eq!(prod.secret_ref(), Some("prod-cred"));
        assert_eq!(prod.username(), None);
    }
}
