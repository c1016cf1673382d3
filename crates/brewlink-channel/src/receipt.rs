//! Receipt-status channel, scoped to one submission run.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use brewlink_core::config::ChannelConfig;
use brewlink_core::events::ReceiptStatusEvent;
use brewlink_core::result::AppResult;
use brewlink_core::types::ChannelKey;

use crate::credentials::CredentialProvider;
use crate::message::{ClientMessage, ServerMessage};
use crate::reconnect::ReconnectPolicy;
use crate::transport::WsConnection;

/// Capability interface for the receipt-status channel.
///
/// The submission machine depends on this trait, never on the concrete
/// transport, so test doubles can script events and count teardowns.
#[async_trait]
pub trait ReceiptChannel: Send {
    /// Open the connection.
    async fn connect(&mut self) -> AppResult<()>;

    /// Join the status topic for one submission run. The server does not
    /// auto-subscribe; this must be called explicitly after `connect`.
    async fn join(&mut self, channel_key: &ChannelKey) -> AppResult<()>;

    /// Await the next status event. `None` means the channel is gone.
    async fn next_event(&mut self) -> Option<ReceiptStatusEvent>;

    /// Tear the channel down: stop the transport and detach handlers.
    async fn stop(&mut self);
}

/// Creates receipt channels, one per submission run.
pub trait ReceiptChannelFactory: Send + Sync {
    /// Create a fresh, unconnected channel.
    fn open(&self) -> Box<dyn ReceiptChannel>;
}

/// WebSocket-backed receipt channel.
pub struct WsReceiptChannel {
    url: String,
    credentials: Arc<dyn CredentialProvider>,
    policy: ReconnectPolicy,
    connection: Option<WsConnection>,
    events: Option<mpsc::Receiver<ServerMessage>>,
}

impl WsReceiptChannel {
    /// Create an unconnected channel against the configured receipt hub.
    pub fn new(config: &ChannelConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            url: config.receipt_hub_url.clone(),
            credentials,
            policy: ReconnectPolicy::from_config(config),
            connection: None,
            events: None,
        }
    }
}

#[async_trait]
impl ReceiptChannel for WsReceiptChannel {
    async fn connect(&mut self) -> AppResult<()> {
        let mut connection = WsConnection::connect(
            self.url.clone(),
            self.credentials.clone(),
            self.policy.clone(),
        )
        .await?;
        self.events = connection.take_events();
        self.connection = Some(connection);
        Ok(())
    }

    async fn join(&mut self, channel_key: &ChannelKey) -> AppResult<()> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| brewlink_core::AppError::channel("Join before connect"))?;
        connection
            .join(ClientMessage::JoinReceipt {
                channel_key: channel_key.clone(),
            })
            .await
    }

    async fn next_event(&mut self) -> Option<ReceiptStatusEvent> {
        let events = self.events.as_mut()?;
        loop {
            match events.recv().await? {
                ServerMessage::ReceiptStatus { event } => return Some(event),
                other => {
                    debug!(message = ?other, "Ignoring non-status frame on receipt channel");
                }
            }
        }
    }

    async fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.stop();
        }
        self.events = None;
    }
}

/// Factory producing [`WsReceiptChannel`] instances.
#[derive(Clone)]
pub struct WsReceiptChannelFactory {
    config: ChannelConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl WsReceiptChannelFactory {
    /// Create a factory bound to the configured receipt hub.
    pub fn new(config: ChannelConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            config,
            credentials,
        }
    }
}

impl ReceiptChannelFactory for WsReceiptChannelFactory {
    fn open(&self) -> Box<dyn ReceiptChannel> {
        Box::new(WsReceiptChannel::new(&self.config, self.credentials.clone()))
    }
}
