//! WebSocket connector for the upstream realtime model.
//!
//! Builds the provider backend at connect time, so missing credentials surface
//! as a per-session setup error rather than a startup failure, then spawns a
//! pump task that owns both halves of the socket.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::base::{
    RealtimeError, RealtimeResult, UpstreamConnector, UpstreamFrame, UpstreamLink,
};
use super::config::RealtimeProviderConfig;
use super::create_realtime_backend;
use super::messages::ClientEvent;

/// Channel capacity for outbound events.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for inbound frames.
const INBOUND_CHANNEL_CAPACITY: usize = 512;

/// Default bound on the TCP + TLS + upgrade handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects to the configured realtime provider over WebSocket.
pub struct WebSocketConnector {
    config: RealtimeProviderConfig,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(config: RealtimeProviderConfig) -> Self {
        Self {
            config,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl UpstreamConnector for WebSocketConnector {
    async fn connect(&self) -> RealtimeResult<UpstreamLink> {
        let backend = create_realtime_backend(&self.config)?;
        let request = backend.build_request()?;

        let (ws_stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    RealtimeError::Timeout(format!(
                        "{} handshake exceeded {:?}",
                        backend.name(),
                        self.connect_timeout
                    ))
                })?
                .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(provider = backend.name(), "Connected to realtime model");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<UpstreamFrame>(INBOUND_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    outbound = out_rx.recv() => {
                        let Some(event) = outbound else {
                            debug!("Upstream sender dropped, closing WebSocket");
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break None;
                        };

                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send WebSocket message: {}", e);
                            break Some(e.to_string());
                        }
                    }

                    inbound = ws_stream.next() => {
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                if in_tx.send(UpstreamFrame::Text(text.to_string())).await.is_err() {
                                    debug!("Upstream receiver dropped");
                                    let _ = ws_sink.send(Message::Close(None)).await;
                                    break None;
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("WebSocket closed by realtime model");
                                break frame.map(|f| f.reason.to_string());
                            }
                            Some(Ok(Message::Binary(data))) => {
                                warn!(len = data.len(), "Ignoring binary frame from realtime model");
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break Some(e.to_string());
                            }
                            None => break None,
                        }
                    }
                }
            };

            let _ = in_tx.send(UpstreamFrame::Closed { reason }).await;
        });

        Ok(UpstreamLink {
            sender: out_tx,
            receiver: in_rx,
            task: Some(task),
        })
    }
}
