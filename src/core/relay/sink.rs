//! Playback destinations backed by the client writer channel.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::messages::ClientRoute;
use crate::core::audio::{encode_pcm_for_transport, wrap_as_playable_container};
use crate::core::playback::{PlaybackEntry, PlaybackError, PlaybackSink};
use crate::core::telephony::OutboundMedia;

/// Sends each entry to a browser as a playable WAV binary frame.
pub struct ClientAudioSink {
    tx: mpsc::Sender<ClientRoute>,
}

impl ClientAudioSink {
    pub fn new(tx: mpsc::Sender<ClientRoute>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl PlaybackSink for ClientAudioSink {
    async fn play(&self, entry: &PlaybackEntry) -> Result<(), PlaybackError> {
        let wav = wrap_as_playable_container(&entry.data)
            .map_err(|e| PlaybackError::Failed(e.to_string()))?;
        self.tx
            .send(ClientRoute::Audio(Bytes::from(wav)))
            .await
            .map_err(|_| PlaybackError::DestinationClosed)
    }
}

/// Sends each entry as a telephony `media` frame on the call's stream.
pub struct TelephonyMediaSink {
    tx: mpsc::Sender<ClientRoute>,
    stream_sid: String,
}

impl TelephonyMediaSink {
    pub fn new(tx: mpsc::Sender<ClientRoute>, stream_sid: impl Into<String>) -> Self {
        Self {
            tx,
            stream_sid: stream_sid.into(),
        }
    }
}

#[async_trait]
impl PlaybackSink for TelephonyMediaSink {
    async fn play(&self, entry: &PlaybackEntry) -> Result<(), PlaybackError> {
        let payload = encode_pcm_for_transport(&entry.data);
        self.tx
            .send(ClientRoute::Media(OutboundMedia::new(
                self.stream_sid.clone(),
                payload,
            )))
            .await
            .map_err(|_| PlaybackError::DestinationClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::WAV_HEADER_LEN;

    fn entry(data: &'static [u8]) -> PlaybackEntry {
        PlaybackEntry {
            sequence: 0,
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_client_sink_sends_wav() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ClientAudioSink::new(tx);
        sink.play(&entry(&[1, 0, 2, 0])).await.unwrap();

        match rx.recv().await {
            Some(ClientRoute::Audio(data)) => {
                assert_eq!(data.len(), WAV_HEADER_LEN + 4);
                assert_eq!(&data[0..4], b"RIFF");
            }
            other => panic!("Expected audio route, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_telephony_sink_sends_media_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = TelephonyMediaSink::new(tx, "MZ1");
        sink.play(&entry(&[0xff, 0x7f])).await.unwrap();

        match rx.recv().await {
            Some(ClientRoute::Media(media)) => {
                assert_eq!(media.stream_sid, "MZ1");
                assert_eq!(media.media.payload, "/38=");
            }
            other => panic!("Expected media route, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_destination() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ClientAudioSink::new(tx);
        assert!(matches!(
            sink.play(&entry(&[0, 0])).await,
            Err(PlaybackError::DestinationClosed)
        ));
    }
}
