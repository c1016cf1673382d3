//! Receipt submission configuration.

use serde::{Deserialize, Serialize};

/// Settings for the receipt submission flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Deadline for the server-side processing wait, in seconds. When no
    /// terminal status event arrives within this window the run fails
    /// with a timeout instead of hanging.
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_seconds: u64,
    /// Latitude reported with receipt initialization.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude reported with receipt initialization.
    #[serde(default)]
    pub longitude: f64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            processing_timeout_seconds: default_processing_timeout(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_processing_timeout() -> u64 {
    120
}
