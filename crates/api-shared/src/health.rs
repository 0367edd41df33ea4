use crate::messages::HealthRes;
use std::path::Path;

/// Simple health service shared by the REST API and the CLI.
///
/// Reports liveness together with the storage root the process is serving
/// from, so a misconfigured deployment is visible from the health endpoint.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` carrying the storage root and the current timestamp.
    pub fn check_health(storage_dir: &Path) -> HealthRes {
        HealthRes {
            success: true,
            message: "Server is running".into(),
            storage: storage_dir.display().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}
