//! Constants used throughout the SNCOP core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for uploaded study material when no explicit directory is configured.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Filename for the flat file-metadata map, stored beside the storage tree.
pub const METADATA_FILENAME: &str = "file-metadata.json";

/// Filename for the denormalized backup document, stored inside the storage tree.
pub const BACKUP_FILENAME: &str = "sncop-backup.json";

/// Reserved subject name; hidden from listings and protected from deletion.
pub const TEMP_SUBJECT_NAME: &str = "temp";

/// Extensions the upload filter admits.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "jpeg", "jpg", "png", "gif"];

/// Length of the epoch-millisecond suffix appended to stored filenames.
pub const TIMESTAMP_SUFFIX_LEN: usize = 13;
