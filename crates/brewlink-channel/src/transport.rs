//! WebSocket transport with reconnection and topic re-join.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brewlink_core::error::{AppError, ErrorKind};
use brewlink_core::result::AppResult;

use crate::credentials::CredentialProvider;
use crate::message::{ClientMessage, ServerMessage};
use crate::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Size of the inbound event buffer.
const EVENT_BUFFER: usize = 64;

/// A hub connection with automatic reconnection.
///
/// The server does not restore join state across reconnects, so every
/// join frame sent through [`WsConnection::join`] is recorded and
/// replayed after each successful reconnect. The access token is fetched
/// fresh from the [`CredentialProvider`] on every connection attempt.
#[derive(Debug)]
pub struct WsConnection {
    outbound_tx: mpsc::Sender<ClientMessage>,
    events_rx: Option<mpsc::Receiver<ServerMessage>>,
    connected_rx: watch::Receiver<bool>,
    joined: Arc<Mutex<Vec<ClientMessage>>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Open the connection.
    ///
    /// The first connection attempt happens inline so callers observe an
    /// immediate failure; after that a supervisor task owns the socket
    /// and drives the reconnect schedule.
    pub async fn connect(
        url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        policy: ReconnectPolicy,
    ) -> AppResult<Self> {
        let url = url.into();
        let stream = open_socket(&url, credentials.as_ref()).await?;
        info!(url = %url, "Push channel connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(EVENT_BUFFER);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (connected_tx, connected_rx) = watch::channel(true);
        let joined = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(supervise(
            stream,
            url,
            credentials,
            policy,
            joined.clone(),
            outbound_rx,
            events_tx,
            connected_tx,
            cancel.clone(),
        ));

        Ok(Self {
            outbound_tx,
            events_rx: Some(events_rx),
            connected_rx,
            joined,
            cancel,
            task,
        })
    }

    /// Send a join frame and record it for replay after reconnects.
    pub async fn join(&self, message: ClientMessage) -> AppResult<()> {
        self.joined.lock().await.push(message.clone());
        self.outbound_tx
            .send(message)
            .await
            .map_err(|_| AppError::channel("Connection is closed, cannot join topic"))
    }

    /// Take the inbound event stream. Yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ServerMessage>> {
        self.events_rx.take()
    }

    /// Whether the transport currently holds a live socket.
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Subscribe to connected-flag changes.
    pub fn connected_watch(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Stop the connection. No automatic action follows; reconnecting
    /// after an explicit stop is the caller's decision.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Why the I/O loop returned.
enum IoExit {
    /// The caller cancelled; do not reconnect.
    Cancelled,
    /// The socket was lost; the reconnect schedule applies.
    Lost,
}

#[allow(clippy::too_many_arguments)]
async fn supervise(
    mut stream: WsStream,
    url: String,
    credentials: Arc<dyn CredentialProvider>,
    policy: ReconnectPolicy,
    joined: Arc<Mutex<Vec<ClientMessage>>>,
    mut outbound_rx: mpsc::Receiver<ClientMessage>,
    events_tx: mpsc::Sender<ServerMessage>,
    connected_tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        connected_tx.send_replace(true);
        let exit = run_io(&mut stream, &mut outbound_rx, &events_tx, &cancel).await;
        connected_tx.send_replace(false);

        if matches!(exit, IoExit::Cancelled) {
            let _ = stream.close(None).await;
            debug!(url = %url, "Push channel stopped");
            return;
        }

        // Reconnect with the configured delay schedule.
        loop {
            let Some(delay) = policy.delay_for(attempt) else {
                warn!(url = %url, attempts = attempt, "Reconnect budget exhausted, hard close");
                return;
            };
            attempt += 1;

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            match open_socket(&url, credentials.as_ref()).await {
                Ok(new_stream) => {
                    info!(url = %url, attempt, "Push channel reconnected");
                    stream = new_stream;
                    attempt = 0;
                    break;
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Reconnect attempt failed");
                }
            }
        }

        // The transport does not restore join state; replay every topic.
        let joins = joined.lock().await.clone();
        for join in joins {
            if let Err(e) = send_frame(&mut stream, &join).await {
                warn!(url = %url, error = %e, "Failed to re-join topic after reconnect");
                break;
            }
        }
    }
}

async fn run_io(
    stream: &mut WsStream,
    outbound_rx: &mut mpsc::Receiver<ClientMessage>,
    events_tx: &mpsc::Sender<ServerMessage>,
    cancel: &CancellationToken,
) -> IoExit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return IoExit::Cancelled,

            outbound = outbound_rx.recv() => match outbound {
                Some(message) => {
                    if let Err(e) = send_frame(stream, &message).await {
                        warn!(error = %e, "Outbound send failed, socket lost");
                        return IoExit::Lost;
                    }
                }
                // All senders dropped: the owning handle is gone.
                None => return IoExit::Cancelled,
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(message) => {
                            if events_tx.send(message).await.is_err() {
                                // Event receiver dropped; nothing left to deliver to.
                                return IoExit::Cancelled;
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "Ignoring unparseable push frame");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return IoExit::Lost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Socket read error");
                    return IoExit::Lost;
                }
            },
        }
    }
}

async fn send_frame(stream: &mut WsStream, message: &ClientMessage) -> AppResult<()> {
    let json = serde_json::to_string(message)?;
    stream
        .send(Message::text(json))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Channel, "WebSocket send failed", e))
}

/// Open a socket with a freshly fetched access token.
async fn open_socket(url: &str, credentials: &dyn CredentialProvider) -> AppResult<WsStream> {
    let token = credentials.access_token().await?;
    let separator = if url.contains('?') { '&' } else { '?' };
    let request_url = format!("{url}{separator}access_token={token}");

    let (stream, _response) = connect_async(request_url).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Channel,
            format!("WebSocket connect failed: {url}"),
            e,
        )
    })?;

    Ok(stream)
}
