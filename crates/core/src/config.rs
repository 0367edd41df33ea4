//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{BACKUP_FILENAME, METADATA_FILENAME};
use crate::{StorageError, StorageResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    storage_dir: PathBuf,
    metadata_file: PathBuf,
    dev_mode: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `storage_dir` is the root of the subject directory tree; the backup
    /// document lives inside it. `metadata_file` is the flat metadata map,
    /// conventionally a sibling of the storage tree.
    pub fn new(storage_dir: PathBuf, metadata_file: PathBuf, dev_mode: bool) -> StorageResult<Self> {
        if storage_dir.as_os_str().is_empty() {
            return Err(StorageError::InvalidInput(
                "storage directory cannot be empty".into(),
            ));
        }
        if metadata_file.as_os_str().is_empty() {
            return Err(StorageError::InvalidInput(
                "metadata file path cannot be empty".into(),
            ));
        }

        Ok(Self {
            storage_dir,
            metadata_file,
            dev_mode,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn metadata_file(&self) -> &Path {
        &self.metadata_file
    }

    /// Path of the backup document inside the storage tree.
    pub fn backup_file(&self) -> PathBuf {
        self.storage_dir.join(BACKUP_FILENAME)
    }

    /// Root directory of one subject.
    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.storage_dir.join(subject)
    }

    /// Whether error responses should carry debug detail.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }
}

/// Resolve a `CoreConfig` from optional environment-style values.
///
/// `storage_dir` defaults to `storage/` and `metadata_file` to
/// `file-metadata.json` beside it. Callers read the actual environment in
/// `main` and pass the values in, keeping the core env-free.
pub fn resolve_config(
    storage_dir: Option<String>,
    metadata_file: Option<String>,
    dev_mode: Option<String>,
) -> StorageResult<CoreConfig> {
    let storage_dir = storage_dir
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(crate::constants::DEFAULT_STORAGE_DIR));

    let metadata_file = metadata_file
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| match storage_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(METADATA_FILENAME),
            _ => PathBuf::from(METADATA_FILENAME),
        });

    CoreConfig::new(storage_dir, metadata_file, dev_mode_from_env_value(dev_mode))
}

/// Parse the dev-mode flag from an optional string value.
///
/// If `value` is `None` or empty/whitespace, dev mode is off.
pub fn dev_mode_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "development"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_file_lives_inside_storage_dir() {
        let cfg = CoreConfig::new(
            PathBuf::from("storage"),
            PathBuf::from("file-metadata.json"),
            false,
        )
        .expect("config should build");

        assert_eq!(cfg.backup_file(), PathBuf::from("storage/sncop-backup.json"));
        assert_eq!(
            cfg.subject_dir("Pharmacology"),
            PathBuf::from("storage/Pharmacology")
        );
    }

    #[test]
    fn rejects_empty_paths() {
        let err = CoreConfig::new(PathBuf::new(), PathBuf::from("m.json"), false)
            .expect_err("empty storage dir should be rejected");
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[test]
    fn resolve_config_applies_defaults() {
        let cfg = resolve_config(None, None, None).expect("defaults should resolve");
        assert_eq!(cfg.storage_dir(), Path::new("storage"));
        assert_eq!(cfg.metadata_file(), Path::new("file-metadata.json"));
        assert!(!cfg.dev_mode());
    }

    #[test]
    fn resolve_config_places_metadata_beside_custom_storage_dir() {
        let cfg = resolve_config(Some("/srv/sncop/storage".into()), None, None)
            .expect("config should resolve");
        assert_eq!(
            cfg.metadata_file(),
            Path::new("/srv/sncop/file-metadata.json")
        );
    }

    #[test]
    fn dev_mode_accepts_common_truthy_values() {
        assert!(dev_mode_from_env_value(Some("true".into())));
        assert!(dev_mode_from_env_value(Some("development".into())));
        assert!(dev_mode_from_env_value(Some(" 1 ".into())));
        assert!(!dev_mode_from_env_value(Some("off".into())));
        assert!(!dev_mode_from_env_value(None));
    }
}
