//! WebSocket transport for the authenticated account channel.

use crate::{BitfinexAdapter, Credentials, FeedConfig, FeedError, Transport};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Message received from WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Text message (JSON).
    Text(String),
    /// Session established and auth handshake sent.
    Connected,
    /// Connection closed by the peer or the network.
    Disconnected,
    /// Error occurred.
    Error(String),
}

struct Session {
    task: JoinHandle<()>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Opens one authenticated session at a time and forwards its frames.
///
/// Reconnect policy lives in the feed connection: a dropped socket is
/// noticed through missing heartbeats, not here.
pub struct WsTransport {
    config: FeedConfig,
    credentials: Credentials,
    tx: mpsc::Sender<WsMessage>,
    session: Option<Session>,
}

impl WsTransport {
    pub fn new(config: FeedConfig, credentials: Credentials, tx: mpsc::Sender<WsMessage>) -> Self {
        Self {
            config,
            credentials,
            tx,
            session: None,
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&mut self) -> Result<(), FeedError> {
        if self.credentials.is_empty() {
            return Err(FeedError::AuthenticationFailed(
                "missing API key or secret".to_string(),
            ));
        }
        self.close().await;

        debug!("Connecting to {}", self.config.ws_url);
        let (ws_stream, response) =
            tokio::time::timeout(self.config.connect_timeout(), connect_async(&self.config.ws_url))
                .await
                .map_err(|_| {
                    FeedError::ConnectionFailed(format!(
                        "timed out after {:?}",
                        self.config.connect_timeout()
                    ))
                })??;
        debug!("Connected (status: {:?})", response.status());

        let (mut write, mut read) = ws_stream.split();

        let auth = BitfinexAdapter::auth_message(&self.credentials, BitfinexAdapter::auth_nonce())?;
        write.send(Message::Text(auth)).await?;
        info!("Auth handshake sent");

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let tx = self.tx.clone();
        let _ = tx.send(WsMessage::Connected).await;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                debug!("Frame receiver dropped, ending session");
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!("Failed to send PONG: {}", e);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Received close frame: {:?}", frame);
                            let _ = tx.send(WsMessage::Disconnected).await;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket read error: {}", e);
                            let _ = tx.send(WsMessage::Error(e.to_string())).await;
                            break;
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            let _ = tx.send(WsMessage::Disconnected).await;
                            break;
                        }
                    },
                    Some(text) = outbound_rx.recv() => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            warn!("Failed to send request: {}", e);
                        }
                    }
                }
            }
        });

        self.session = Some(Session { task, outbound });
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
            debug!("WebSocket session closed");
        }
    }

    async fn send(&mut self, text: String) -> Result<(), FeedError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| FeedError::Disconnected("no open session".to_string()))?;
        session
            .outbound
            .send(text)
            .map_err(|_| FeedError::Disconnected("session ended".to_string()))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}
