//! Request and response types for the SNCOP storage REST API.
//!
//! Field names follow the JSON casing the browser client already speaks
//! (camelCase, with `type` for kind discriminators). The backup-document
//! types double as the on-disk schema of `sncop-backup.json`, so renaming a
//! field here is a data-format change, not a cosmetic one.

use serde::{Deserialize, Serialize};
use sncop_types::{FileKind, ResourceKind};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A subject entry in the backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BackupSubject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub units: Vec<String>,
}

/// A file entry in one of the backup document's three lists.
///
/// The `type` field carries the [`FileKind`] (pdf/image), not the resource
/// kind; which list the entry sits in already encodes the latter. `unit` is
/// present only for notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: String,
    pub upload_date: String,
    pub subject: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: FileKind,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// The denormalized backup document persisted as `sncop-backup.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default)]
    pub subjects: Vec<BackupSubject>,
    #[serde(default)]
    pub notes: Vec<BackupFile>,
    #[serde(default)]
    pub practice_tests: Vec<BackupFile>,
    #[serde(default)]
    pub practicals: Vec<BackupFile>,
    #[serde(default)]
    pub last_backup: Option<String>,
}

impl BackupDocument {
    /// The file list for a resource kind.
    pub fn files(&self, kind: ResourceKind) -> &Vec<BackupFile> {
        match kind {
            ResourceKind::Notes => &self.notes,
            ResourceKind::PracticeTests => &self.practice_tests,
            ResourceKind::Practicals => &self.practicals,
        }
    }

    /// Mutable access to the file list for a resource kind.
    pub fn files_mut(&mut self, kind: ResourceKind) -> &mut Vec<BackupFile> {
        match kind {
            ResourceKind::Notes => &mut self.notes,
            ResourceKind::PracticeTests => &mut self.practice_tests,
            ResourceKind::Practicals => &mut self.practicals,
        }
    }

    /// True when none of the three file lists contain an entry.
    pub fn has_no_files(&self) -> bool {
        self.notes.is_empty() && self.practice_tests.is_empty() && self.practicals.is_empty()
    }
}

/// The record returned to the admin panel after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: String,
    pub upload_date: String,
    pub subject: String,
    /// Empty string for kinds without units.
    pub unit: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: ResourceKind,
    pub file_path: String,
    #[schema(value_type = String)]
    pub file_type: FileKind,
}

/// A file entry in the storage-sync structure, enriched with catalog titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileSummary {
    pub filename: String,
    pub title: String,
    pub description: String,
    pub size: String,
    pub modified: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: FileKind,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Per-subject slice of the storage-sync structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectFiles {
    pub notes: BTreeMap<String, Vec<FileSummary>>,
    #[serde(rename = "practice-tests")]
    pub practice_tests: Vec<FileSummary>,
    pub practicals: Vec<FileSummary>,
}

/// A bare directory listing entry (live tree only, no catalog join).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DirEntry {
    pub filename: String,
    pub size: String,
    pub modified: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: FileKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSubjectReq {
    pub name: String,
    #[serde(default)]
    pub units: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddUnitReq {
    pub unit_name: String,
}

/// Response for operations that create a directory and report its location.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PathRes {
    pub success: bool,
    pub message: String,
    pub path: String,
}

/// Response for operations that only report success.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    pub success: bool,
    pub message: String,
    pub file: StoredFile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListFilesRes {
    pub success: bool,
    pub files: Vec<DirEntry>,
}

/// One file the client wants existence-checked.
///
/// `type` is deliberately a raw string: an unknown kind reports the file as
/// missing rather than failing the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFileQuery {
    pub id: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub stored_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedFile {
    pub id: String,
    pub exists: bool,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyFilesReq {
    pub files: Vec<VerifyFileQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFilesRes {
    pub success: bool,
    pub verified_files: Vec<VerifiedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSyncRes {
    pub success: bool,
    pub storage_structure: BTreeMap<String, SubjectFiles>,
    pub backup_data: BackupDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub success: bool,
    pub message: String,
    pub storage: String,
    pub timestamp: String,
}

/// The JSON error envelope every failing endpoint produces.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub success: bool,
    pub message: String,
    /// Underlying error text, present on internal failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Debug detail, only populated when dev mode is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// The unmatched path, only populated by the 404 fallback route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_file_serializes_with_client_field_names() {
        let file = BackupFile {
            id: "1700000000000".into(),
            title: "Intro".into(),
            description: String::new(),
            file_name: "intro.pdf".into(),
            stored_file_name: "intro_1700000000000.pdf".into(),
            file_size: "1.5 KB".into(),
            upload_date: "01/01/2024".into(),
            subject: "Pharmacology".into(),
            kind: FileKind::Pdf,
            file_path: "storage/Pharmacology/notes/Unit 1/intro_1700000000000.pdf".into(),
            unit: Some("Unit 1".into()),
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["fileName"], "intro.pdf");
        assert_eq!(json["storedFileName"], "intro_1700000000000.pdf");
        assert_eq!(json["type"], "pdf");
        assert_eq!(json["unit"], "Unit 1");
    }

    #[test]
    fn backup_file_omits_unit_for_non_notes() {
        let file = BackupFile {
            id: "1".into(),
            title: "Mock test".into(),
            description: String::new(),
            file_name: "mock.pdf".into(),
            stored_file_name: "mock_1700000000000.pdf".into(),
            file_size: "2 KB".into(),
            upload_date: "01/01/2024".into(),
            subject: "Anatomy".into(),
            kind: FileKind::Pdf,
            file_path: "storage/Anatomy/practice-tests/mock_1700000000000.pdf".into(),
            unit: None,
        };

        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("unit").is_none());
    }

    #[test]
    fn backup_document_tolerates_missing_lists() {
        let doc: BackupDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.subjects.is_empty());
        assert!(doc.has_no_files());
        assert!(doc.last_backup.is_none());
    }

    #[test]
    fn backup_document_round_trips_camel_case_lists() {
        let json = r#"{"subjects":[],"notes":[],"practiceTests":[],"practicals":[],"lastBackup":"2024-01-01T00:00:00.000Z"}"#;
        let doc: BackupDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.last_backup.as_deref(), Some("2024-01-01T00:00:00.000Z"));

        let out = serde_json::to_value(&doc).unwrap();
        assert!(out.get("practiceTests").is_some());
        assert!(out.get("practice_tests").is_none());
    }

    #[test]
    fn subject_files_uses_hyphenated_practice_tests_key() {
        let json = serde_json::to_value(SubjectFiles::default()).unwrap();
        assert!(json.get("practice-tests").is_some());
        assert!(json.get("notes").is_some());
        assert!(json.get("practicals").is_some());
    }
}
