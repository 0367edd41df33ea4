//! # API Shared
//!
//! Shared wire types and utilities for the SNCOP storage APIs.
//!
//! Contains:
//! - Request/response types for the REST API (`messages` module)
//! - The persisted backup-document schema, which is served verbatim by the
//!   storage-sync endpoint
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`, `sncop-core`, and the CLI for common definitions.

pub mod health;
pub mod messages;

pub use health::HealthService;
pub use messages::*;
