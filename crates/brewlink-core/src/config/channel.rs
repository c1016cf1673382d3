//! Push-channel configuration.

use serde::{Deserialize, Serialize};

/// Settings for the push-channel clients.
///
/// The receipt and presence hubs are distinct endpoints and are never
/// served by a shared connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket URL of the receipt-status hub.
    #[serde(default = "default_receipt_hub_url")]
    pub receipt_hub_url: String,
    /// WebSocket URL of the cafe-presence hub.
    #[serde(default = "default_presence_hub_url")]
    pub presence_hub_url: String,
    /// Reconnect delay steps in milliseconds. After the last step the
    /// client keeps retrying at that interval.
    #[serde(default = "default_reconnect_delays")]
    pub reconnect_delays_ms: Vec<u64>,
    /// Optional cap on automatic reconnect attempts. `None` retries
    /// forever; once exhausted the connection hard-closes.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            receipt_hub_url: default_receipt_hub_url(),
            presence_hub_url: default_presence_hub_url(),
            reconnect_delays_ms: default_reconnect_delays(),
            max_reconnect_attempts: None,
        }
    }
}

fn default_receipt_hub_url() -> String {
    "ws://localhost:8080/hubs/receipt".to_string()
}

fn default_presence_hub_url() -> String {
    "ws://localhost:8080/hubs/presence".to_string()
}

fn default_reconnect_delays() -> Vec<u64> {
    vec![0, 2_000, 5_000, 10_000, 30_000]
}
