//! Receipt processing status events and their outcome classification.
//!
//! The server does not guarantee an explicit status field on the terminal
//! event: success may be signalled only by the presence of `expires_at`,
//! failure only by the presence of `reject_reason`. That inference is
//! fragile, so it lives in exactly one place, [`ReceiptStatusEvent::classify`],
//! and every call site branches on the resulting [`ReceiptOutcome`] instead
//! of the raw fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CafeId, ChannelKey, ReceiptId};

/// Raw status event pushed on the receipt channel.
///
/// Every field except `receipt_id` is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptStatusEvent {
    /// Literal status string, when the server sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The receipt this event refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<ReceiptId>,
    /// Session expiry granted on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Cafe the session belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cafe_id: Option<CafeId>,
    /// Presence-channel key issued with the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_key: Option<ChannelKey>,
    /// Rejection reason on failure; authoritative and shown verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl ReceiptStatusEvent {
    /// Classify the event into a tagged outcome.
    ///
    /// Success discriminant: `status == "DONE"` or `expires_at` present.
    /// Failure discriminant: `status == "FAILED"` or `reject_reason`
    /// present. Anything else is `Unknown` and is not terminal.
    pub fn classify(&self) -> ReceiptOutcome {
        let status = self.status.as_deref();

        if status == Some("DONE") || self.expires_at.is_some() {
            return ReceiptOutcome::Success {
                expires_at: self.expires_at,
                cafe_id: self.cafe_id,
                channel_key: self.channel_key.clone(),
                receipt_id: self.receipt_id.clone(),
            };
        }

        if status == Some("FAILED") || self.reject_reason.is_some() {
            return ReceiptOutcome::Failure {
                reason: self.reject_reason.clone(),
            };
        }

        ReceiptOutcome::Unknown {
            status: self.status.clone(),
        }
    }
}

/// Classified terminal (or non-terminal) outcome of a receipt run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptOutcome {
    /// The receipt was accepted and a session was granted.
    Success {
        /// Server-granted expiry, when present.
        expires_at: Option<DateTime<Utc>>,
        /// Cafe the session belongs to, when present.
        cafe_id: Option<CafeId>,
        /// Presence-channel key, when present.
        channel_key: Option<ChannelKey>,
        /// The receipt that produced the session.
        receipt_id: Option<ReceiptId>,
    },
    /// The receipt was rejected.
    Failure {
        /// Server-provided reason, shown verbatim when present.
        reason: Option<String>,
    },
    /// A progress event that is neither success nor failure.
    Unknown {
        /// The literal status string, if any.
        status: Option<String>,
    },
}

impl ReceiptOutcome {
    /// Whether this outcome ends the run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}
