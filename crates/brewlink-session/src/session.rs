//! The cafe session entity and its liveness math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewlink_core::types::{CafeId, ChannelKey, ReceiptId};

/// A server-issued, time-bounded cafe session.
///
/// At most one session is active per profile. `expires_at` is the single
/// source of truth for liveness; a missing expiry is always treated as
/// expired, never as "no limit".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeSession {
    /// The physical cafe this session belongs to. Immutable once set.
    pub cafe_id: CafeId,
    /// Presence-channel key joined for this session. Required before any
    /// navigation to the presence view; a session lacking it is unusable
    /// even if unexpired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_key: Option<ChannelKey>,
    /// Absolute expiry instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// The receipt that produced this session, once processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<ReceiptId>,
    /// Timestamp of the last persistence write. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CafeSession {
    /// Create a session with only the required cafe id set.
    pub fn new(cafe_id: CafeId) -> Self {
        Self {
            cafe_id,
            channel_key: None,
            expires_at: None,
            receipt_id: None,
            saved_at: None,
        }
    }

    /// Whether the session is expired at the given instant.
    ///
    /// A missing `expires_at` is always expired, and the expiry instant
    /// itself counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// Whether the session is usable for presence navigation: unexpired
    /// and carrying a channel key.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && self.channel_key.is_some()
    }

    /// Remaining time at the given instant, decomposed for display.
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> TimeRemaining {
        let Some(expires_at) = self.expires_at else {
            return TimeRemaining::expired();
        };

        let delta_ms = (expires_at - now).num_milliseconds();
        if delta_ms <= 0 {
            return TimeRemaining::expired();
        }

        TimeRemaining {
            expired: false,
            minutes: delta_ms / 60_000,
            seconds: (delta_ms % 60_000) / 1_000,
        }
    }
}

/// Remaining session time as a minutes:seconds display decomposition.
///
/// `seconds` is the remainder after whole minutes, not a cumulative total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    /// Whether the session is already expired.
    pub expired: bool,
    /// Whole minutes remaining.
    pub minutes: i64,
    /// Leftover seconds within the current minute.
    pub seconds: i64,
}

impl TimeRemaining {
    /// The canonical expired value.
    pub fn expired() -> Self {
        Self {
            expired: true,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Whether the countdown should switch to its urgent presentation.
    pub fn is_urgent(&self, threshold_minutes: i64) -> bool {
        !self.expired && self.minutes < threshold_minutes
    }
}
