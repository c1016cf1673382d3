//! Cafe presence channel and roster tracking.
//!
//! Lives for the duration of a cafe visit, independently of any receipt
//! run. The server pushes the full roster on every change; the local
//! roster is replaced wholesale, never merged.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use brewlink_core::config::ChannelConfig;
use brewlink_core::events::PresentUser;
use brewlink_core::result::AppResult;
use brewlink_core::types::CafeId;

use crate::credentials::CredentialProvider;
use crate::message::{ClientMessage, ServerMessage};
use crate::reconnect::ReconnectPolicy;
use crate::transport::WsConnection;

/// Holds the current roster of one cafe.
#[derive(Debug, Clone)]
pub struct RosterTracker {
    tx: watch::Sender<Vec<PresentUser>>,
}

impl RosterTracker {
    /// Create an empty roster.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx }
    }

    /// Replace the roster wholesale.
    pub fn replace(&self, users: Vec<PresentUser>) {
        self.tx.send_replace(users);
    }

    /// Current roster snapshot.
    pub fn current(&self) -> Vec<PresentUser> {
        self.tx.borrow().clone()
    }

    /// Subscribe to roster changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PresentUser>> {
        self.tx.subscribe()
    }
}

impl Default for RosterTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket-backed cafe presence channel.
pub struct PresenceChannel {
    url: String,
    credentials: Arc<dyn CredentialProvider>,
    policy: ReconnectPolicy,
    roster: RosterTracker,
    connection: Option<WsConnection>,
    pump: Option<JoinHandle<()>>,
}

impl PresenceChannel {
    /// Create an unconnected channel against the configured presence hub.
    pub fn new(config: &ChannelConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            url: config.presence_hub_url.clone(),
            credentials,
            policy: ReconnectPolicy::from_config(config),
            roster: RosterTracker::new(),
            connection: None,
            pump: None,
        }
    }

    /// Open the connection and start feeding roster updates.
    pub async fn connect(&mut self) -> AppResult<()> {
        let mut connection = WsConnection::connect(
            self.url.clone(),
            self.credentials.clone(),
            self.policy.clone(),
        )
        .await?;

        let Some(mut events) = connection.take_events() else {
            return Err(brewlink_core::AppError::internal(
                "Event stream already taken on a fresh connection",
            ));
        };
        let roster = self.roster.clone();

        self.pump = Some(tokio::spawn(async move {
            while let Some(message) = events.recv().await {
                match message {
                    ServerMessage::Roster { users } => {
                        debug!(count = users.len(), "Roster replaced");
                        roster.replace(users);
                    }
                    other => {
                        debug!(message = ?other, "Ignoring non-roster frame on presence channel");
                    }
                }
            }
        }));

        self.connection = Some(connection);
        Ok(())
    }

    /// Join a cafe's presence topic.
    pub async fn join(&self, cafe_id: CafeId) -> AppResult<()> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| brewlink_core::AppError::channel("Join before connect"))?;
        connection.join(ClientMessage::JoinCafe { cafe_id }).await
    }

    /// The roster tracker for this cafe.
    pub fn roster(&self) -> &RosterTracker {
        &self.roster
    }

    /// Whether the transport currently holds a live socket.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(WsConnection::is_connected)
    }

    /// Tear the channel down and clear the roster.
    pub fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.stop();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.roster.replace(Vec::new());
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        self.stop();
    }
}
