//! # brewlink
//!
//! Facade for the BrewLink client session core. Re-exports the member
//! crates and provides telemetry initialization.
//!
//! The core is a session lifecycle synchronizer: a receipt submission
//! produces a server-issued, time-bounded cafe session, which is kept
//! consistent across a durable store, in-memory shared state, and the
//! push channels that deliver processing results and presence rosters.

pub mod telemetry;

pub use brewlink_channel as channel;
pub use brewlink_core as core;
pub use brewlink_receipt as receipt;
pub use brewlink_session as session;

pub use brewlink_core::config::AppConfig;
pub use brewlink_core::{AppError, AppResult};
