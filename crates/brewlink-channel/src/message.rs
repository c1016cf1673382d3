//! Wire message type definitions for the push channels.

use serde::{Deserialize, Serialize};

use brewlink_core::events::{PresentUser, ReceiptStatusEvent};
use brewlink_core::types::{CafeId, ChannelKey};

/// Messages sent by the client to a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the receipt-status topic for one submission run.
    JoinReceipt {
        /// The server-issued channel key to subscribe to.
        channel_key: ChannelKey,
    },
    /// Join a cafe's presence topic.
    JoinCafe {
        /// Numeric cafe identifier.
        cafe_id: CafeId,
    },
}

/// Messages pushed by a hub to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Receipt processing status update.
    ReceiptStatus {
        /// The raw status event; classification happens downstream.
        #[serde(flatten)]
        event: ReceiptStatusEvent,
    },
    /// Full roster replacement for the joined cafe.
    Roster {
        /// Everyone currently present; replaces the local roster
        /// wholesale.
        users: Vec<PresentUser>,
    },
}
