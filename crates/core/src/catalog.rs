//! The persisted catalog: flat metadata map plus denormalized backup document.
//!
//! Two JSON documents mirror the storage tree:
//!
//! - `file-metadata.json` — a flat map from a composite key
//!   (`{subject}-{type}-{unit-or-empty}-{storedFileName}`) to the
//!   title/description captured at upload time.
//! - `storage/sncop-backup.json` — the denormalized backup document with one
//!   list per resource kind, used to rebuild listings when the live tree is
//!   empty (for example after restoring the JSON stores without the files).
//!
//! Both documents are loaded once at startup and rewritten in full after
//! every mutation. Loading is deliberately tolerant: unreadable or corrupt
//! stores reset to empty rather than preventing startup, and gaps between
//! the two documents are repaired (metadata backfilled from backup entries,
//! subjects reconstructed from file entries when the subject list is empty).

use crate::{CoreConfig, StorageError, StorageResult};
use api_shared::{BackupDocument, BackupFile, BackupSubject};
use serde::{Deserialize, Serialize};
use sncop_types::ResourceKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Per-file descriptive metadata captured at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub original_file_name: String,
}

/// Composite key addressing one stored file in the metadata map.
pub fn metadata_key(
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    stored_file_name: &str,
) -> String {
    format!(
        "{subject}-{}-{}-{stored_file_name}",
        kind.dir_name(),
        unit.unwrap_or("")
    )
}

/// In-memory form of both persisted documents.
#[derive(Debug, Default)]
pub struct Catalog {
    metadata: BTreeMap<String, MetadataRecord>,
    backup: BackupDocument,
}

impl Catalog {
    /// Loads both documents, repairing gaps between them.
    ///
    /// Returns the catalog and a flag indicating whether repairs were made
    /// (in which case the caller should persist the repaired state).
    pub fn load(cfg: &CoreConfig) -> (Self, bool) {
        let mut catalog = match Self::read_stores(cfg.metadata_file(), &cfg.backup_file()) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("failed to load catalog, starting empty: {e}");
                Catalog::default()
            }
        };

        tracing::info!(
            "loaded {} metadata entries, backup with {} subjects, {} notes, {} practice tests, {} practicals",
            catalog.metadata.len(),
            catalog.backup.subjects.len(),
            catalog.backup.notes.len(),
            catalog.backup.practice_tests.len(),
            catalog.backup.practicals.len()
        );

        let backfilled = catalog.backfill_metadata();
        let reconstructed = catalog.reconstruct_subjects();
        if reconstructed > 0 {
            tracing::info!("reconstructed {reconstructed} subjects from backup data");
        }

        (catalog, backfilled > 0 || reconstructed > 0)
    }

    fn read_stores(metadata_file: &Path, backup_file: &Path) -> StorageResult<Self> {
        let metadata = if metadata_file.is_file() {
            let raw = fs::read_to_string(metadata_file).map_err(StorageError::FileRead)?;
            serde_json::from_str(&raw).map_err(StorageError::Deserialization)?
        } else {
            BTreeMap::new()
        };

        let backup = if backup_file.is_file() {
            let raw = fs::read_to_string(backup_file).map_err(StorageError::FileRead)?;
            serde_json::from_str(&raw).map_err(StorageError::Deserialization)?
        } else {
            BackupDocument::default()
        };

        Ok(Self { metadata, backup })
    }

    /// Writes both documents back to disk, refreshing the backup timestamp.
    pub fn save(&mut self, cfg: &CoreConfig) -> StorageResult<()> {
        self.backup.last_backup = Some(
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );

        let metadata_json =
            serde_json::to_string_pretty(&self.metadata).map_err(StorageError::Serialization)?;
        write_with_parents(cfg.metadata_file(), &metadata_json)?;

        let backup_json =
            serde_json::to_string_pretty(&self.backup).map_err(StorageError::Serialization)?;
        write_with_parents(&cfg.backup_file(), &backup_json)?;

        Ok(())
    }

    /// Inserts metadata records for backup entries that are missing one.
    fn backfill_metadata(&mut self) -> usize {
        let mut added = 0;
        for kind in ResourceKind::ALL {
            for file in self.backup.files(kind) {
                let key = metadata_key(
                    &file.subject,
                    kind,
                    file.unit.as_deref(),
                    &file.stored_file_name,
                );
                if !self.metadata.contains_key(&key) {
                    self.metadata.insert(
                        key,
                        MetadataRecord {
                            title: file.title.clone(),
                            description: file.description.clone(),
                            original_file_name: file.file_name.clone(),
                        },
                    );
                    added += 1;
                }
            }
        }
        added
    }

    /// Rebuilds the subject list from file entries when it is empty.
    fn reconstruct_subjects(&mut self) -> usize {
        if !self.backup.subjects.is_empty() || self.backup.has_no_files() {
            return 0;
        }

        let mut names = BTreeSet::new();
        for kind in ResourceKind::ALL {
            for file in self.backup.files(kind) {
                if !file.subject.is_empty() {
                    names.insert(file.subject.clone());
                }
            }
        }

        let now_millis = chrono::Utc::now().timestamp_millis();
        for name in names {
            let units: Vec<String> = self
                .backup
                .notes
                .iter()
                .filter(|note| note.subject == name)
                .filter_map(|note| note.unit.clone())
                .filter(|unit| !unit.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            self.backup.subjects.push(BackupSubject {
                id: reconstruction_id(now_millis),
                name,
                units,
            });
        }

        self.backup.subjects.len()
    }

    pub fn metadata(&self, key: &str) -> Option<&MetadataRecord> {
        self.metadata.get(key)
    }

    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    pub fn upsert_metadata(&mut self, key: String, record: MetadataRecord) {
        self.metadata.insert(key, record);
    }

    pub fn remove_metadata(&mut self, key: &str) {
        self.metadata.remove(key);
    }

    pub fn backup(&self) -> &BackupDocument {
        &self.backup
    }

    /// Removes any prior entry for the same stored file, then appends.
    pub fn replace_file(&mut self, kind: ResourceKind, file: BackupFile) {
        let unit = file.unit.clone();
        self.remove_file(
            kind,
            &file.subject,
            unit.as_deref(),
            &file.stored_file_name,
        );
        self.backup.files_mut(kind).push(file);
    }

    /// Removes the entry for one stored file, if present.
    pub fn remove_file(
        &mut self,
        kind: ResourceKind,
        subject: &str,
        unit: Option<&str>,
        stored_file_name: &str,
    ) {
        let unit_matches = |entry: &BackupFile| {
            !kind.has_units() || entry.unit.as_deref().unwrap_or("") == unit.unwrap_or("")
        };
        self.backup.files_mut(kind).retain(|entry| {
            !(entry.stored_file_name == stored_file_name
                && entry.subject == subject
                && unit_matches(entry))
        });
    }

    /// Registers a subject seen during upload, extending its units if needed.
    pub fn ensure_subject(&mut self, name: &str, unit: Option<&str>, now_millis: i64) {
        match self.backup.subjects.iter_mut().find(|s| s.name == name) {
            Some(subject) => {
                if let Some(unit) = unit.filter(|u| !u.is_empty()) {
                    if !subject.units.iter().any(|u| u == unit) {
                        subject.units.push(unit.to_string());
                    }
                }
            }
            None => {
                self.backup.subjects.push(BackupSubject {
                    id: now_millis.to_string(),
                    name: name.to_string(),
                    units: unit
                        .filter(|u| !u.is_empty())
                        .map(|u| vec![u.to_string()])
                        .unwrap_or_default(),
                });
            }
        }
    }

    /// Replaces the subject record with the same name, or appends a new one.
    pub fn upsert_subject(&mut self, name: &str, units: Vec<String>, now_millis: i64) {
        let record = BackupSubject {
            id: now_millis.to_string(),
            name: name.to_string(),
            units,
        };
        match self.backup.subjects.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = record,
            None => self.backup.subjects.push(record),
        }
    }

    /// Appends a unit to an existing subject. Returns true if anything changed.
    pub fn add_unit(&mut self, subject_name: &str, unit: &str) -> bool {
        if let Some(subject) = self
            .backup
            .subjects
            .iter_mut()
            .find(|s| s.name == subject_name)
        {
            if !subject.units.iter().any(|u| u == unit) {
                subject.units.push(unit.to_string());
                return true;
            }
        }
        false
    }

    /// Purges the subject record and every file entry belonging to it.
    pub fn remove_subject(&mut self, name: &str) {
        self.backup.subjects.retain(|s| s.name != name);
        self.backup.notes.retain(|f| f.subject != name);
        self.backup.practice_tests.retain(|f| f.subject != name);
        self.backup.practicals.retain(|f| f.subject != name);
    }
}

/// Identifier for subjects recreated from backup file entries.
fn reconstruction_id(now_millis: i64) -> String {
    let entropy = uuid::Uuid::new_v4().simple().to_string();
    format!("{now_millis}{}", &entropy[..8])
}

fn write_with_parents(path: &Path, contents: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::DirCreation)?;
        }
    }
    fs::write(path, contents).map_err(StorageError::FileWrite)
}
