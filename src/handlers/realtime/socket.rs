//! Adapts an axum WebSocket to the relay's frame stream and writer channel.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::core::relay::{ClientFrame, ClientRoute};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// How long the writer may take to flush after the relay finishes.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Inbound client frames; the stream ends after the first `Close`.
pub(crate) type ClientFrames = BoxStream<'static, ClientFrame>;

/// Outbound half of a client socket.
pub(crate) struct ClientWriter {
    tx: mpsc::Sender<ClientRoute>,
    task: JoinHandle<()>,
}

/// Split a socket into its frame stream and a writer task.
pub(crate) fn split_socket(socket: WebSocket) -> (ClientFrames, ClientWriter) {
    let (mut sender, receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ClientRoute>(CHANNEL_BUFFER_SIZE);

    let writer = tokio::spawn(async move {
        while let Some(route) = rx.recv().await {
            let should_close = matches!(route, ClientRoute::Close);

            let result = match route {
                ClientRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                ClientRoute::Media(media) => match serde_json::to_string(&media) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize media frame: {}", e);
                        continue;
                    }
                },
                ClientRoute::Audio(data) => sender.send(Message::Binary(data)).await,
                ClientRoute::Close => sender.send(Message::Close(None)).await,
            };

            if let Err(e) = result {
                debug!("Client socket write failed: {}", e);
                break;
            }
            if should_close {
                break;
            }
        }
    });

    let frames = receiver
        .filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(ClientFrame::Text(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => Some(ClientFrame::Binary(data)),
                Ok(Message::Close(_)) => Some(ClientFrame::Close),
                Ok(Message::Ping(_) | Message::Pong(_)) => None,
                Err(e) => {
                    warn!("Client WebSocket error: {}", e);
                    Some(ClientFrame::Close)
                }
            }
        })
        .scan(false, |closed, frame| {
            let item = (!*closed).then(|| {
                *closed = matches!(frame, ClientFrame::Close);
                frame
            });
            futures::future::ready(item)
        })
        .boxed();

    (frames, ClientWriter { tx, task: writer })
}

impl ClientWriter {
    pub fn sender(&self) -> mpsc::Sender<ClientRoute> {
        self.tx.clone()
    }

    /// Close the socket and wait for queued frames to flush.
    pub async fn finish(self) {
        let ClientWriter { tx, task } = self;
        let _ = tx.send(ClientRoute::Close).await;
        drop(tx);

        let abort = task.abort_handle();
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, task).await.is_err() {
            debug!("Client writer did not drain in time, aborting");
            abort.abort();
        }
    }
}
