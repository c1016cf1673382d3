//! Cafe presence roster events.

use serde::{Deserialize, Serialize};

/// One patron currently present in a cafe.
///
/// The server pushes the full roster on every change; this is the element
/// type of that replacement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentUser {
    /// Stable user identifier.
    pub user_id: String,
    /// Display name shown in the roster.
    pub display_name: String,
    /// Optional free-form status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
