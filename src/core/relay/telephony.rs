//! Media stream handshake for telephony relays.

use futures::{Stream, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::messages::ClientFrame;
use crate::core::telephony::{MediaStreamEvent, StreamStart};

/// How long a media stream may take to send its `start` frame.
pub const DEFAULT_STREAM_START_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamStartError {
    #[error("Media stream ended before start")]
    Closed,
    #[error("Timed out waiting for media stream start")]
    Timeout,
}

/// Read frames until the stream's `start` event arrives.
///
/// Frames before `start` carry no audio and are skipped.
pub async fn await_stream_start<S>(
    inbound: &mut S,
    bound: Duration,
) -> Result<StreamStart, StreamStartError>
where
    S: Stream<Item = ClientFrame> + Unpin,
{
    tokio::time::timeout(bound, read_start(inbound))
        .await
        .map_err(|_| StreamStartError::Timeout)?
}

async fn read_start<S>(inbound: &mut S) -> Result<StreamStart, StreamStartError>
where
    S: Stream<Item = ClientFrame> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        let text = match frame {
            ClientFrame::Text(text) => text,
            ClientFrame::Binary(_) => continue,
            ClientFrame::Close => return Err(StreamStartError::Closed),
        };

        match serde_json::from_str::<MediaStreamEvent>(&text) {
            Ok(MediaStreamEvent::Start {
                mut start,
                stream_sid,
            }) => {
                if start.stream_sid.is_empty()
                    && let Some(sid) = stream_sid
                {
                    start.stream_sid = sid;
                }
                return Ok(start);
            }
            Ok(MediaStreamEvent::Stop) => return Err(StreamStartError::Closed),
            Ok(other) => debug!(?other, "Skipping media frame before start"),
            Err(e) => debug!(error = %e, "Ignoring unparseable media frame"),
        }
    }
    Err(StreamStartError::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn text(json: &str) -> ClientFrame {
        ClientFrame::Text(json.to_string())
    }

    #[tokio::test]
    async fn test_start_after_connected() {
        let mut frames = stream::iter(vec![
            text(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#),
            text(
                r#"{"event":"start","start":{"streamSid":"MZ1","callSid":"CA1","customParameters":{"interviewId":"int-2"}}}"#,
            ),
        ]);

        let start = await_stream_start(&mut frames, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(start.stream_sid, "MZ1");
        assert_eq!(start.interview_id(), Some("int-2"));
    }

    #[tokio::test]
    async fn test_outer_stream_sid_fills_gap() {
        let mut frames = stream::iter(vec![text(
            r#"{"event":"start","streamSid":"MZ9","start":{"callSid":"CA1"}}"#,
        )]);
        let start = await_stream_start(&mut frames, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(start.stream_sid, "MZ9");
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let mut frames = stream::iter(vec![text(r#"{"event":"stop"}"#)]);
        assert_eq!(
            await_stream_start(&mut frames, Duration::from_secs(1)).await,
            Err(StreamStartError::Closed)
        );
    }

    #[tokio::test]
    async fn test_start_timeout() {
        let mut frames = stream::pending::<ClientFrame>();
        assert_eq!(
            await_stream_start(&mut frames, Duration::from_millis(20)).await,
            Err(StreamStartError::Timeout)
        );
    }
}
