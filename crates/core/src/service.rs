//! Storage operations over the subject tree and the persisted catalog.
//!
//! [`StorageService`] is the single entry point for every mutating and
//! reading operation the API exposes: provisioning subjects and units,
//! storing uploads, resolving and deleting files, directory listings, batch
//! existence checks, and the storage-sync reconciliation that joins the live
//! tree with catalog titles (falling back to the backup document when the
//! tree is empty).
//!
//! The catalog lives behind one internal mutex; each mutating operation
//! performs its read-modify-write and the full rewrite of both JSON
//! documents while holding it, so concurrent requests cannot lose each
//! other's catalog updates. There is no transactional coupling between the
//! filesystem and the catalog: a file write that succeeds before a catalog
//! write that fails leaves the stores divergent until a later upload or
//! delete touches the same entry.

use crate::catalog::{metadata_key, Catalog, MetadataRecord};
use crate::{naming, paths, CoreConfig, StorageError, StorageResult};
use api_shared::{
    BackupDocument, BackupFile, DirEntry, FileSummary, StoredFile, SubjectFiles, VerifiedFile,
    VerifyFileQuery,
};
use chrono::{DateTime, Local, Utc};
use sncop_types::{FileKind, NonEmptyText, ResourceKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything the upload endpoint collected from the multipart request.
///
/// All descriptive fields are optional here so validation order (and its
/// error messages) is decided in one place, [`StorageService::store_upload`].
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Option<Vec<u8>>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub kind: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Result of a storage-sync reconciliation.
#[derive(Debug)]
pub struct StorageSync {
    pub structure: BTreeMap<String, SubjectFiles>,
    pub backup: BackupDocument,
}

/// Pure storage operations - no API concerns.
#[derive(Clone)]
pub struct StorageService {
    cfg: Arc<CoreConfig>,
    catalog: Arc<Mutex<Catalog>>,
}

impl StorageService {
    /// Creates the service, ensuring the storage root exists and loading the
    /// catalog (persisting any startup repairs).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage directory cannot be created or
    /// a repaired catalog cannot be persisted.
    pub fn new(cfg: Arc<CoreConfig>) -> StorageResult<Self> {
        fs::create_dir_all(cfg.storage_dir()).map_err(StorageError::StorageDirCreation)?;

        let (mut catalog, repaired) = Catalog::load(&cfg);
        if repaired {
            catalog.save(&cfg)?;
        }

        Ok(Self {
            cfg,
            catalog: Arc::new(Mutex::new(catalog)),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Provisions the directory tree for a subject and upserts its record.
    ///
    /// Creates `notes/{unit}` for each unit plus `practice-tests` and
    /// `practicals`. Calling this twice with the same name replaces the
    /// subject record instead of duplicating it.
    pub fn create_subject(&self, name: &str, units: &[String]) -> StorageResult<PathBuf> {
        let name = NonEmptyText::new(name).map_err(|_| StorageError::MissingField("name"))?;

        let subject_dir = self.cfg.subject_dir(name.as_str());
        let notes_dir = subject_dir.join(ResourceKind::Notes.dir_name());
        fs::create_dir_all(&notes_dir).map_err(StorageError::DirCreation)?;
        for unit in units {
            fs::create_dir_all(notes_dir.join(unit)).map_err(StorageError::DirCreation)?;
        }
        fs::create_dir_all(subject_dir.join(ResourceKind::PracticeTests.dir_name()))
            .map_err(StorageError::DirCreation)?;
        fs::create_dir_all(subject_dir.join(ResourceKind::Practicals.dir_name()))
            .map_err(StorageError::DirCreation)?;

        let mut catalog = self.catalog();
        catalog.upsert_subject(name.as_str(), units.to_vec(), Utc::now().timestamp_millis());
        catalog.save(&self.cfg)?;

        Ok(subject_dir)
    }

    /// Creates a unit directory under a subject's notes and records it.
    pub fn add_unit(&self, subject: &str, unit: &str) -> StorageResult<PathBuf> {
        let subject =
            NonEmptyText::new(subject).map_err(|_| StorageError::MissingField("subject"))?;
        let unit = NonEmptyText::new(unit).map_err(|_| StorageError::MissingField("unitName"))?;

        let unit_dir = self
            .cfg
            .subject_dir(subject.as_str())
            .join(ResourceKind::Notes.dir_name())
            .join(unit.as_str());
        fs::create_dir_all(&unit_dir).map_err(StorageError::DirCreation)?;

        let mut catalog = self.catalog();
        if catalog.add_unit(subject.as_str(), unit.as_str()) {
            catalog.save(&self.cfg)?;
        }

        Ok(unit_dir)
    }

    /// Removes a subject's directory tree and purges it from the catalog.
    ///
    /// Idempotent with respect to the tree: succeeds even when no directory
    /// exists. The reserved name "temp" is rejected.
    pub fn delete_subject(&self, name: &str) -> StorageResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(crate::constants::TEMP_SUBJECT_NAME)
        {
            return Err(StorageError::InvalidInput("invalid subject name".into()));
        }

        let subject_dir = self.cfg.subject_dir(trimmed);
        if subject_dir.exists() {
            fs::remove_dir_all(&subject_dir).map_err(StorageError::DirRemoval)?;
            tracing::info!("deleted subject folder: {}", subject_dir.display());
        }

        let mut catalog = self.catalog();
        catalog.remove_subject(trimmed);
        catalog.save(&self.cfg)
    }

    /// Validates and stores one uploaded file, updating both catalog stores.
    ///
    /// Validation order: file present, file type allowed, title, subject,
    /// type, unit (notes only). On success the file lands at its canonical
    /// path under a generated `{base}_{millis}{ext}` name, the metadata map
    /// is upserted, the backup list gets a replace-then-append, and the
    /// subject record is created or its units extended.
    pub fn store_upload(&self, req: UploadRequest) -> StorageResult<StoredFile> {
        let (file_name, data) = match (req.file_name, req.data) {
            (Some(name), Some(data)) if !name.trim().is_empty() => (name.trim().to_string(), data),
            _ => return Err(StorageError::NoFile),
        };
        ensure_allowed_upload(&file_name, req.content_type.as_deref())?;

        let title = required(req.title, "title")?;
        let subject = required(req.subject, "subject")?;
        let kind: ResourceKind = required(req.kind, "type")?.parse()?;
        let unit = req
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .filter(|_| kind.has_units())
            .map(str::to_string);
        if kind.has_units() && unit.is_none() {
            return Err(StorageError::UnitRequired);
        }
        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let target_dir = paths::resource_dir(
            self.cfg.storage_dir(),
            &subject,
            kind,
            unit.as_deref(),
        )?;
        fs::create_dir_all(&target_dir).map_err(StorageError::DirCreation)?;

        let now_millis = Utc::now().timestamp_millis();
        let stored_file_name = naming::stored_file_name(&file_name, now_millis);
        let target_path = target_dir.join(&stored_file_name);
        fs::write(&target_path, &data).map_err(StorageError::FileWrite)?;
        tracing::info!("stored upload at {}", target_path.display());

        let stored = StoredFile {
            id: now_millis.to_string(),
            title: title.clone(),
            description: description.clone(),
            file_name: file_name.clone(),
            stored_file_name: stored_file_name.clone(),
            file_size: naming::format_file_size(data.len() as u64),
            upload_date: naming::short_date(Local::now()),
            subject: subject.clone(),
            unit: unit.clone().unwrap_or_default(),
            kind,
            file_path: target_path.display().to_string(),
            file_type: FileKind::from_file_name(&file_name),
        };

        let mut catalog = self.catalog();
        catalog.upsert_metadata(
            metadata_key(&subject, kind, unit.as_deref(), &stored_file_name),
            MetadataRecord {
                title,
                description: description.clone(),
                original_file_name: file_name,
            },
        );
        catalog.replace_file(
            kind,
            BackupFile {
                id: stored.id.clone(),
                title: stored.title.clone(),
                description,
                file_name: stored.file_name.clone(),
                stored_file_name,
                file_size: stored.file_size.clone(),
                upload_date: stored.upload_date.clone(),
                subject: subject.clone(),
                kind: stored.file_type,
                file_path: stored.file_path.clone(),
                unit: unit.clone(),
            },
        );
        catalog.ensure_subject(&subject, unit.as_deref(), now_millis);
        catalog.save(&self.cfg)?;

        Ok(stored)
    }

    /// Resolves a stored file to its existing on-disk location.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::FileNotFound` when neither the canonical path
    /// nor any fallback variant exists.
    pub fn open_file(
        &self,
        subject: &str,
        kind: ResourceKind,
        unit: Option<&str>,
        filename: &str,
    ) -> StorageResult<PathBuf> {
        paths::resolve_existing_file(self.cfg.storage_dir(), subject, kind, unit, filename)?
            .ok_or(StorageError::FileNotFound)
    }

    /// Deletes a stored file from disk and both catalog stores.
    ///
    /// The catalog entries are addressed by the *requested* subject and
    /// unit even when a fallback path satisfied the disk lookup, matching
    /// how the entries were keyed at upload time.
    pub fn delete_file(
        &self,
        subject: &str,
        kind: ResourceKind,
        unit: Option<&str>,
        filename: &str,
    ) -> StorageResult<()> {
        let path = self.open_file(subject, kind, unit, filename)?;
        fs::remove_file(&path).map_err(StorageError::FileDelete)?;
        tracing::info!("deleted file at {}", path.display());

        let mut catalog = self.catalog();
        catalog.remove_metadata(&metadata_key(subject, kind, unit, filename));
        catalog.remove_file(kind, subject, unit, filename);
        catalog.save(&self.cfg)
    }

    /// Lists the live directory for `(subject, kind, unit?)`.
    ///
    /// Reads the tree only; no backup fallback. A missing directory yields
    /// an empty list.
    pub fn list_dir(
        &self,
        subject: &str,
        kind: ResourceKind,
        unit: Option<&str>,
    ) -> StorageResult<Vec<DirEntry>> {
        let dir = match unit {
            Some(unit) if kind.has_units() => self
                .cfg
                .subject_dir(subject)
                .join(kind.dir_name())
                .join(unit),
            _ => self.cfg.subject_dir(subject).join(kind.dir_name()),
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(StorageError::DirList)? {
            let entry = entry.map_err(StorageError::DirList)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let metadata = fs::metadata(&path).map_err(StorageError::FileRead)?;
            entries.push(DirEntry {
                filename: filename.to_string(),
                size: naming::format_file_size(metadata.len()),
                modified: modified_date(&metadata),
                kind: FileKind::from_file_name(filename),
            });
        }
        Ok(entries)
    }

    /// Batch existence check against canonical paths only (no fallback).
    ///
    /// Queries with an unknown kind, or notes without a unit, report the
    /// file as missing rather than failing the batch.
    pub fn verify_files(&self, queries: &[VerifyFileQuery]) -> Vec<VerifiedFile> {
        queries
            .iter()
            .map(|query| {
                let kind: Option<ResourceKind> = query.kind.parse().ok();
                let path = kind.and_then(|kind| {
                    paths::canonical_file_path(
                        self.cfg.storage_dir(),
                        &query.subject,
                        kind,
                        query.unit.as_deref(),
                        &query.stored_file_name,
                    )
                    .ok()
                });

                match path {
                    Some(path) if path.is_file() => VerifiedFile {
                        id: query.id.clone(),
                        exists: true,
                        file_path: path.display().to_string(),
                    },
                    Some(path) => {
                        tracing::warn!("file not found on server: {}", path.display());
                        VerifiedFile {
                            id: query.id.clone(),
                            exists: false,
                            file_path: path.display().to_string(),
                        }
                    }
                    None => VerifiedFile {
                        id: query.id.clone(),
                        exists: false,
                        file_path: "unknown".into(),
                    },
                }
            })
            .collect()
    }

    /// Builds the reconciled subject structure, falling back to the backup
    /// document when the live tree contributes nothing.
    pub fn storage_sync(&self, subject: Option<&str>) -> StorageResult<StorageSync> {
        let catalog = self.catalog();
        let mut structure = BTreeMap::new();

        match subject {
            Some(name) => {
                if self.cfg.subject_dir(name).is_dir() {
                    structure.insert(name.to_string(), self.subject_files(name, &catalog));
                }
            }
            None => {
                if self.cfg.storage_dir().is_dir() {
                    let read = fs::read_dir(self.cfg.storage_dir())
                        .map_err(StorageError::DirList)?;
                    for entry in read.flatten() {
                        let path = entry.path();
                        if !path.is_dir() {
                            continue;
                        }
                        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                            continue;
                        };
                        if name.eq_ignore_ascii_case(crate::constants::TEMP_SUBJECT_NAME) {
                            continue;
                        }
                        structure.insert(name.to_string(), self.subject_files(name, &catalog));
                    }
                }
            }
        }

        if structure.is_empty() && !catalog.backup().subjects.is_empty() {
            tracing::info!("storage structure empty, using backup data");
            structure = structure_from_backup(catalog.backup());
        }

        Ok(StorageSync {
            structure,
            backup: catalog.backup().clone(),
        })
    }

    /// Walks one subject directory into its notes/tests/practicals slices.
    ///
    /// Read failures inside the walk are logged and skipped so one bad
    /// entry cannot hide the rest of the subject.
    fn subject_files(&self, subject: &str, catalog: &Catalog) -> SubjectFiles {
        let mut out = SubjectFiles::default();
        let subject_dir = self.cfg.subject_dir(subject);

        let notes_dir = subject_dir.join(ResourceKind::Notes.dir_name());
        if let Ok(units) = fs::read_dir(&notes_dir) {
            for unit_entry in units.flatten() {
                let unit_path = unit_entry.path();
                if !unit_path.is_dir() {
                    continue;
                }
                let Some(unit) = unit_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let summaries = self.dir_summaries(
                    &unit_path,
                    subject,
                    ResourceKind::Notes,
                    Some(unit),
                    catalog,
                );
                out.notes.insert(unit.to_string(), summaries);
            }
        }

        for kind in [ResourceKind::PracticeTests, ResourceKind::Practicals] {
            let dir = subject_dir.join(kind.dir_name());
            if !dir.is_dir() {
                continue;
            }
            let summaries = self.dir_summaries(&dir, subject, kind, None, catalog);
            match kind {
                ResourceKind::PracticeTests => out.practice_tests = summaries,
                ResourceKind::Practicals => out.practicals = summaries,
                ResourceKind::Notes => unreachable!(),
            }
        }

        out
    }

    fn dir_summaries(
        &self,
        dir: &Path,
        subject: &str,
        kind: ResourceKind,
        unit: Option<&str>,
        catalog: &Catalog,
    ) -> Vec<FileSummary> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", dir.display());
                return Vec::new();
            }
        };

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let stat = match fs::metadata(&path) {
                Ok(stat) => stat,
                Err(e) => {
                    tracing::warn!("failed to stat {}: {e}", path.display());
                    continue;
                }
            };

            let record = catalog.metadata(&metadata_key(subject, kind, unit, filename));
            let title = record
                .map(|r| r.title.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| naming::derive_title(filename));
            let description = record.map(|r| r.description.clone()).unwrap_or_default();

            summaries.push(FileSummary {
                filename: filename.to_string(),
                title,
                description,
                size: naming::format_file_size(stat.len()),
                modified: modified_date(&stat),
                kind: FileKind::from_file_name(filename),
                subject: subject.to_string(),
                unit: unit.map(str::to_string),
            });
        }
        summaries
    }
}

/// Rebuilds the sync structure purely from the backup document.
fn structure_from_backup(backup: &BackupDocument) -> BTreeMap<String, SubjectFiles> {
    let mut structure = BTreeMap::new();

    for subject in &backup.subjects {
        if subject
            .name
            .eq_ignore_ascii_case(crate::constants::TEMP_SUBJECT_NAME)
        {
            continue;
        }

        let mut files = SubjectFiles::default();
        for note in backup.notes.iter().filter(|n| n.subject == subject.name) {
            let unit = note.unit.clone().unwrap_or_default();
            files
                .notes
                .entry(unit)
                .or_default()
                .push(backup_summary(note));
        }
        files.practice_tests = backup
            .practice_tests
            .iter()
            .filter(|t| t.subject == subject.name)
            .map(backup_summary)
            .collect();
        files.practicals = backup
            .practicals
            .iter()
            .filter(|p| p.subject == subject.name)
            .map(backup_summary)
            .collect();

        structure.insert(subject.name.clone(), files);
    }

    structure
}

fn backup_summary(file: &BackupFile) -> FileSummary {
    FileSummary {
        filename: file.stored_file_name.clone(),
        title: file.title.clone(),
        description: file.description.clone(),
        size: file.file_size.clone(),
        modified: file.upload_date.clone(),
        kind: file.kind,
        subject: file.subject.clone(),
        unit: file.unit.clone(),
    }
}

fn modified_date(metadata: &fs::Metadata) -> String {
    metadata
        .modified()
        .map(|time| naming::short_date(DateTime::<Local>::from(time)))
        .unwrap_or_default()
}

/// Validates a trimmed required field, naming it in the error.
fn required(value: Option<String>, field: &'static str) -> StorageResult<String> {
    let trimmed = value.as_deref().map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return Err(StorageError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Upload filter: extension and declared MIME type must both be allowed.
fn ensure_allowed_upload(file_name: &str, content_type: Option<&str>) -> StorageResult<()> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let ext_ok = crate::constants::ALLOWED_EXTENSIONS.contains(&ext.as_str());

    let mime = content_type.unwrap_or("").to_ascii_lowercase();
    let mime_ok = crate::constants::ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| mime.contains(allowed));

    if ext_ok && mime_ok {
        Ok(())
    } else {
        tracing::warn!("upload rejected: {file_name} ({mime})");
        Err(StorageError::UnsupportedFileType(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                dir.join("storage"),
                dir.join("file-metadata.json"),
                false,
            )
            .expect("CoreConfig::new should succeed"),
        )
    }

    fn test_service(dir: &Path) -> StorageService {
        StorageService::new(test_cfg(dir)).expect("service should initialise")
    }

    fn note_upload(subject: &str, unit: &str, title: &str, file_name: &str) -> UploadRequest {
        UploadRequest {
            file_name: Some(file_name.to_string()),
            content_type: Some("application/pdf".into()),
            data: Some(b"%PDF-1.4 test payload".to_vec()),
            title: Some(title.to_string()),
            subject: Some(subject.to_string()),
            kind: Some("notes".into()),
            unit: Some(unit.to_string()),
            description: Some("".into()),
        }
    }

    fn read_metadata_store(cfg: &CoreConfig) -> serde_json::Value {
        let raw = fs::read_to_string(cfg.metadata_file()).expect("metadata store should exist");
        serde_json::from_str(&raw).expect("metadata store should parse")
    }

    fn read_backup_store(cfg: &CoreConfig) -> BackupDocument {
        let raw = fs::read_to_string(cfg.backup_file()).expect("backup store should exist");
        serde_json::from_str(&raw).expect("backup store should parse")
    }

    #[test]
    fn upload_stores_file_resolvable_with_matching_bytes() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let stored = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");

        assert!(stored.stored_file_name.starts_with("intro_"));
        assert!(stored.stored_file_name.ends_with(".pdf"));
        assert_eq!(stored.kind, ResourceKind::Notes);
        assert_eq!(stored.file_type, FileKind::Pdf);
        assert_eq!(stored.unit, "Unit 1");

        let resolved = service
            .open_file(
                "Pharmacology",
                ResourceKind::Notes,
                Some("Unit 1"),
                &stored.stored_file_name,
            )
            .expect("stored file should resolve");
        let bytes = fs::read(&resolved).expect("stored file should be readable");
        assert_eq!(bytes, b"%PDF-1.4 test payload");
    }

    #[test]
    fn upload_updates_both_catalog_stores() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let stored = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");

        let key = format!("Pharmacology-notes-Unit 1-{}", stored.stored_file_name);
        let metadata = read_metadata_store(service.config());
        assert_eq!(metadata[&key]["title"], "Intro");
        assert_eq!(metadata[&key]["originalFileName"], "intro.pdf");

        let backup = read_backup_store(service.config());
        assert_eq!(backup.notes.len(), 1);
        assert_eq!(backup.notes[0].stored_file_name, stored.stored_file_name);
        assert_eq!(backup.notes[0].unit.as_deref(), Some("Unit 1"));
        assert_eq!(backup.subjects.len(), 1);
        assert_eq!(backup.subjects[0].name, "Pharmacology");
        assert_eq!(backup.subjects[0].units, vec!["Unit 1"]);
    }

    #[test]
    fn upload_rejects_disallowed_file_types_before_side_effects() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let err = service
            .store_upload(UploadRequest {
                file_name: Some("malware.exe".into()),
                content_type: Some("application/octet-stream".into()),
                data: Some(vec![0x4d, 0x5a]),
                ..note_upload("Pharmacology", "Unit 1", "Bad", "x.pdf")
            })
            .expect_err("exe upload must be rejected");

        assert!(matches!(err, StorageError::UnsupportedFileType(_)));
        assert!(
            !service.config().subject_dir("Pharmacology").exists(),
            "no directories should be created for a rejected upload"
        );
    }

    #[test]
    fn upload_validation_reports_first_missing_field() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let err = service
            .store_upload(UploadRequest {
                title: Some("  ".into()),
                ..note_upload("Pharmacology", "Unit 1", "x", "intro.pdf")
            })
            .expect_err("blank title must be rejected");
        assert!(matches!(err, StorageError::MissingField("title")));

        let err = service
            .store_upload(UploadRequest {
                unit: None,
                ..note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf")
            })
            .expect_err("notes without unit must be rejected");
        assert!(matches!(err, StorageError::UnitRequired));

        let err = service
            .store_upload(UploadRequest {
                data: None,
                ..note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf")
            })
            .expect_err("missing file must be rejected");
        assert!(matches!(err, StorageError::NoFile));
    }

    #[test]
    fn listing_returns_exactly_the_undeleted_uploads() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let first = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "One", "one.pdf"))
            .expect("first upload");
        let second = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Two", "two.pdf"))
            .expect("second upload");

        service
            .delete_file(
                "Pharmacology",
                ResourceKind::Notes,
                Some("Unit 1"),
                &first.stored_file_name,
            )
            .expect("delete should succeed");

        let entries = service
            .list_dir("Pharmacology", ResourceKind::Notes, Some("Unit 1"))
            .expect("listing should succeed");
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec![second.stored_file_name.as_str()]);
    }

    #[test]
    fn delete_file_removes_disk_metadata_and_backup_entry() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let stored = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");
        let path = PathBuf::from(&stored.file_path);
        assert!(path.is_file());

        service
            .delete_file(
                "Pharmacology",
                ResourceKind::Notes,
                Some("Unit 1"),
                &stored.stored_file_name,
            )
            .expect("delete should succeed");

        assert!(!path.exists(), "file should be gone from disk");

        let key = format!("Pharmacology-notes-Unit 1-{}", stored.stored_file_name);
        let metadata = read_metadata_store(service.config());
        assert!(
            metadata.get(&key).is_none(),
            "metadata entry should be gone"
        );

        let backup = read_backup_store(service.config());
        assert!(backup.notes.is_empty(), "backup entry should be gone");
    }

    #[test]
    fn delete_file_resolves_underscored_unit_directories() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let unit_dir = service
            .config()
            .subject_dir("Pharmacology")
            .join("notes/Unit_1");
        fs::create_dir_all(&unit_dir).expect("create legacy unit dir");
        let file = unit_dir.join("legacy_1700000000000.pdf");
        fs::write(&file, b"legacy").expect("write legacy file");

        service
            .delete_file(
                "Pharmacology",
                ResourceKind::Notes,
                Some("Unit 1"),
                "legacy_1700000000000.pdf",
            )
            .expect("delete should find the underscored directory");

        assert!(!file.exists());
    }

    #[test]
    fn delete_file_reports_not_found_after_fallback_search() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let err = service
            .delete_file(
                "Pharmacology",
                ResourceKind::Notes,
                Some("Unit 1"),
                "missing.pdf",
            )
            .expect_err("missing file should not delete");
        assert!(matches!(err, StorageError::FileNotFound));
    }

    #[test]
    fn create_subject_provisions_the_full_tree() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let subject_dir = service
            .create_subject("Pharmacology", &["Unit 1".into(), "Unit 2".into()])
            .expect("create should succeed");

        assert!(subject_dir.join("notes/Unit 1").is_dir());
        assert!(subject_dir.join("notes/Unit 2").is_dir());
        assert!(subject_dir.join("practice-tests").is_dir());
        assert!(subject_dir.join("practicals").is_dir());
    }

    #[test]
    fn create_subject_twice_keeps_one_record() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        service
            .create_subject("Pharmacology", &["Unit 1".into()])
            .expect("first create");
        service
            .create_subject("Pharmacology", &["Unit 1".into()])
            .expect("second create");

        let backup = read_backup_store(service.config());
        let matching: Vec<_> = backup
            .subjects
            .iter()
            .filter(|s| s.name == "Pharmacology")
            .collect();
        assert_eq!(matching.len(), 1, "create must replace, not duplicate");
    }

    #[test]
    fn add_unit_creates_directory_and_extends_record() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        service
            .create_subject("Pharmacology", &["Unit 1".into()])
            .expect("create subject");
        let unit_dir = service
            .add_unit("Pharmacology", "Unit 2")
            .expect("add unit");

        assert!(unit_dir.is_dir());
        let backup = read_backup_store(service.config());
        assert_eq!(backup.subjects[0].units, vec!["Unit 1", "Unit 2"]);
    }

    #[test]
    fn delete_subject_named_temp_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        for name in ["temp", "TEMP", "Temp"] {
            let err = service
                .delete_subject(name)
                .expect_err("temp subject must never be deletable");
            assert!(matches!(err, StorageError::InvalidInput(_)));
        }
    }

    #[test]
    fn delete_subject_is_idempotent_for_missing_directories() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        service
            .delete_subject("NeverExisted")
            .expect("deleting an absent subject should succeed");
    }

    #[test]
    fn upload_sync_delete_subject_scenario() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");

        let sync = service.storage_sync(None).expect("sync should succeed");
        let subject = sync
            .structure
            .get("Pharmacology")
            .expect("subject should appear in sync");
        let unit_files = subject
            .notes
            .get("Unit 1")
            .expect("unit should appear in sync");
        assert_eq!(unit_files.len(), 1);
        assert_eq!(unit_files[0].title, "Intro");

        service
            .delete_subject("Pharmacology")
            .expect("delete subject should succeed");

        let sync = service.storage_sync(None).expect("sync should succeed");
        assert!(
            !sync.structure.contains_key("Pharmacology"),
            "deleted subject should disappear from sync"
        );
        assert!(sync.backup.notes.is_empty());
        assert!(sync.backup.subjects.is_empty());
    }

    #[test]
    fn sync_derives_titles_for_files_without_metadata() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let unit_dir = service
            .config()
            .subject_dir("Biology")
            .join("notes/Unit 1");
        fs::create_dir_all(&unit_dir).expect("create unit dir");
        fs::write(unit_dir.join("Cell_Biology_1700000000000.pdf"), b"%PDF-")
            .expect("write file");

        let sync = service.storage_sync(Some("Biology")).expect("sync");
        let files = &sync.structure["Biology"].notes["Unit 1"];
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].title, "Cell Biology");
        assert_eq!(files[0].kind, FileKind::Pdf);
    }

    #[test]
    fn sync_falls_back_to_backup_when_tree_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let stored = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");

        // Wipe the subject directory, keeping the catalog stores.
        fs::remove_dir_all(service.config().subject_dir("Pharmacology"))
            .expect("remove subject tree");

        let sync = service.storage_sync(None).expect("sync should succeed");
        let subject = sync
            .structure
            .get("Pharmacology")
            .expect("backup fallback should rebuild the subject");
        let unit_files = subject.notes.get("Unit 1").expect("unit from backup");
        assert_eq!(unit_files[0].filename, stored.stored_file_name);
        assert_eq!(unit_files[0].title, "Intro");
    }

    #[test]
    fn sync_skips_temp_directories() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        fs::create_dir_all(service.config().storage_dir().join("temp"))
            .expect("create temp dir");
        service
            .create_subject("Pharmacology", &[])
            .expect("create subject");

        let sync = service.storage_sync(None).expect("sync");
        assert!(sync.structure.contains_key("Pharmacology"));
        assert!(!sync.structure.contains_key("temp"));
    }

    #[test]
    fn verify_files_reports_existing_and_missing() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let stored = service
            .store_upload(note_upload("Pharmacology", "Unit 1", "Intro", "intro.pdf"))
            .expect("upload should succeed");

        let results = service.verify_files(&[
            VerifyFileQuery {
                id: "a".into(),
                subject: "Pharmacology".into(),
                kind: "notes".into(),
                unit: Some("Unit 1".into()),
                stored_file_name: stored.stored_file_name.clone(),
            },
            VerifyFileQuery {
                id: "b".into(),
                subject: "Pharmacology".into(),
                kind: "notes".into(),
                unit: Some("Unit 1".into()),
                stored_file_name: "missing.pdf".into(),
            },
            VerifyFileQuery {
                id: "c".into(),
                subject: "Pharmacology".into(),
                kind: "lectures".into(),
                unit: None,
                stored_file_name: "x.pdf".into(),
            },
        ]);

        assert_eq!(results.len(), 3);
        assert!(results[0].exists);
        assert!(!results[1].exists);
        assert!(!results[2].exists);
        assert_eq!(results[2].file_path, "unknown");
    }

    #[test]
    fn list_dir_for_missing_directory_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        let service = test_service(temp.path());

        let entries = service
            .list_dir("Ghost", ResourceKind::Practicals, None)
            .expect("listing should succeed");
        assert!(entries.is_empty());
    }

    #[test]
    fn upload_filter_requires_both_extension_and_mime() {
        assert!(ensure_allowed_upload("a.pdf", Some("application/pdf")).is_ok());
        assert!(ensure_allowed_upload("a.png", Some("image/png")).is_ok());
        assert!(ensure_allowed_upload("a.pdf", Some("text/html")).is_err());
        assert!(ensure_allowed_upload("a.html", Some("application/pdf")).is_err());
        assert!(ensure_allowed_upload("a.pdf", None).is_err());
    }
}
