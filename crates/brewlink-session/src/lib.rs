//! # brewlink-session
//!
//! Cafe session lifecycle for the BrewLink client core:
//!
//! - [`CafeSession`] entity with TTL math
//! - [`SessionStore`]: durable single-record JSON store
//! - [`SharedSessionState`]: in-memory reactive mirror
//! - [`SessionClock`]: per-observer 1-second countdown
//!
//! Reads always prefer shared state over the durable store; the store is
//! the fallback source after a restart and re-populates shared state on a
//! successful read.

pub mod clock;
pub mod resolver;
pub mod session;
pub mod shared;
pub mod store;

pub use clock::{ClockHandle, CountdownTick, SessionClock};
pub use resolver::{bootstrap, resolve_current};
pub use session::{CafeSession, TimeRemaining};
pub use shared::SharedSessionState;
pub use store::SessionStore;
