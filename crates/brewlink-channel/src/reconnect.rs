//! Reconnect scheduling with fixed delay steps.

use std::time::Duration;

use brewlink_core::config::ChannelConfig;

/// Fixed-step reconnect schedule.
///
/// Attempts walk through the configured delay steps (immediate, 2 s, 5 s,
/// 10 s, 30 s by default) and then keep retrying at the last interval.
/// An optional attempt budget turns exhaustion into a hard close.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
    max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Build the policy from channel configuration.
    pub fn from_config(config: &ChannelConfig) -> Self {
        let delays = if config.reconnect_delays_ms.is_empty() {
            vec![Duration::from_secs(30)]
        } else {
            config
                .reconnect_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect()
        };

        Self {
            delays,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before the given zero-based reconnect attempt, or `None`
    /// when the attempt budget is exhausted (hard close).
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let index = (attempt as usize).min(self.delays.len() - 1);
        Some(self.delays[index])
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}
