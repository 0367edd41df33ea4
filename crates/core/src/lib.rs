//! # SNCOP Core
//!
//! Core business logic for the SNCOP study-material storage backend.
//!
//! This crate contains pure data operations and file/folder management:
//! - Subject/unit provisioning and deletion under the storage root
//! - Upload persistence with generated, timestamp-suffixed filenames
//! - The persisted catalog (flat metadata map + denormalized backup document)
//!   and its startup repair heuristics
//! - Path resolution with legacy-naming fallbacks (spaces vs underscores vs
//!   hyphens vs case)
//! - The storage-sync reconciliation of the live tree against the catalog
//!
//! **No API concerns**: HTTP servers, routing, and multipart parsing belong
//! in `api-rest`; shared wire types live in `api-shared`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod naming;
pub mod paths;
pub mod service;

pub use config::{dev_mode_from_env_value, resolve_config, CoreConfig};
pub use error::{StorageError, StorageResult};
pub use service::{StorageService, StorageSync, UploadRequest};

// Re-export the validated primitives so downstream crates rarely need to
// depend on sncop-types directly.
pub use sncop_types::{FileKind, NonEmptyText, ResourceKind, TextError};
