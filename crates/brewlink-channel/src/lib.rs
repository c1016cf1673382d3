//! # brewlink-channel
//!
//! Push-channel clients for the BrewLink session core:
//!
//! - [`transport::WsConnection`]: WebSocket client with automatic
//!   reconnection, topic re-join, and per-attempt credential fetch
//! - [`receipt::WsReceiptChannel`]: short-lived channel for one receipt
//!   submission run
//! - [`presence::PresenceChannel`]: long-lived channel tracking a cafe's
//!   roster
//!
//! The two channel kinds never share a transport connection; their
//! lifetimes are independent.

pub mod credentials;
pub mod message;
pub mod presence;
pub mod receipt;
pub mod reconnect;
pub mod transport;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use presence::{PresenceChannel, RosterTracker};
pub use receipt::{ReceiptChannel, ReceiptChannelFactory, WsReceiptChannelFactory};
pub use reconnect::ReconnectPolicy;
