//! Cafe-session policy configuration.

use serde::{Deserialize, Serialize};

/// Session lifecycle policy.
///
/// The fallback duration covers the case where the server omits
/// `expires_at` on a success event. It is configurable policy, not
/// business truth; applying it is logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the durable session record file.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Session length assumed when the server omits `expires_at`.
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration_minutes: i64,
    /// Remaining minutes below which the countdown is flagged urgent.
    #[serde(default = "default_urgent_threshold")]
    pub urgent_threshold_minutes: i64,
    /// Countdown poll period in seconds.
    #[serde(default = "default_clock_tick")]
    pub clock_tick_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            fallback_duration_minutes: default_fallback_duration(),
            urgent_threshold_minutes: default_urgent_threshold(),
            clock_tick_seconds: default_clock_tick(),
        }
    }
}

fn default_storage_path() -> String {
    "data/cafe_session.json".to_string()
}

fn default_fallback_duration() -> i64 {
    60
}

fn default_urgent_threshold() -> i64 {
    5
}

fn default_clock_tick() -> u64 {
    1
}
