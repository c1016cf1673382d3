//! In-memory shared session state.
//!
//! The reactive mirror of the durable store: every UI entry point reads
//! from here first. Backed by a `tokio::sync::watch` cell: last writer
//! wins, observers subscribe for changes.

use tokio::sync::watch;

use crate::session::CafeSession;

/// Process-wide shared session state.
///
/// Cloning is cheap; all clones observe the same cell.
#[derive(Debug, Clone)]
pub struct SharedSessionState {
    tx: watch::Sender<Option<CafeSession>>,
}

impl SharedSessionState {
    /// Create an empty shared state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Current session, if any.
    pub fn get(&self) -> Option<CafeSession> {
        self.tx.borrow().clone()
    }

    /// Replace the current session.
    pub fn set(&self, session: CafeSession) {
        self.tx.send_replace(Some(session));
    }

    /// Remove the current session.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<CafeSession>> {
        self.tx.subscribe()
    }
}

impl Default for SharedSessionState {
    fn default() -> Self {
        Self::new()
    }
}
