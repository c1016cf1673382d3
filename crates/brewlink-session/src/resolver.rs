//! Session resolution across shared state and the durable store.
//!
//! Reads always prefer shared state; the durable store is consulted only
//! on a miss (e.g. after a restart), and a successful durable read
//! re-populates shared state so later reads stay in memory.

use chrono::Utc;
use tracing::debug;

use crate::session::CafeSession;
use crate::shared::SharedSessionState;
use crate::store::SessionStore;

/// Resolve the current valid session.
///
/// An expired session found in shared state is evicted before falling
/// through to the store, whose `load` already evicts expired records.
pub async fn resolve_current(
    shared: &SharedSessionState,
    store: &SessionStore,
) -> Option<CafeSession> {
    if let Some(session) = shared.get() {
        if !session.is_expired_at(Utc::now()) {
            return Some(session);
        }
        // Evict, mirroring the store's expired-record handling, so direct
        // `get` callers stop seeing the stale record.
        debug!(cafe_id = %session.cafe_id, "Evicting expired session from shared state");
        shared.clear();
    }

    let session = store.load().await?;
    debug!(cafe_id = %session.cafe_id, "Re-populated shared state from durable store");
    shared.set(session.clone());
    Some(session)
}

/// Hydrate shared state from the durable store at application start.
///
/// This is the only point where persisted state seeds memory state;
/// afterwards shared state is authoritative.
pub async fn bootstrap(shared: &SharedSessionState, store: &SessionStore) -> Option<CafeSession> {
    resolve_current(shared, store).await
}
