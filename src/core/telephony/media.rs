//! Telephony media stream frames.
//!
//! The gateway opens a bidirectional media stream per call. Inbound frames are
//! JSON tagged by `event`; audio is base64 G.711 u-law at 8kHz in both
//! directions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frame received from the telephony media stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamEvent {
    /// Socket established, before any stream metadata
    Connected,
    /// Stream metadata; always precedes media
    Start {
        start: StreamStart,
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },
    /// One chunk of caller audio
    Media { media: MediaPayload },
    /// Playback marker reached
    Mark,
    /// Caller hung up or the stream was stopped
    Stop,
    #[serde(other)]
    Other,
}

/// Metadata carried by the `start` frame.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    #[serde(default)]
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: String,
    /// `<Parameter>` values from the TwiML that opened the stream
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

impl StreamStart {
    pub fn interview_id(&self) -> Option<&str> {
        self.custom_parameters
            .get("interviewId")
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}

/// Base64 audio chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Audio frame sent back on the media stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    /// Always "media"
    pub event: &'static str,
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    pub media: MediaPayload,
}

impl OutboundMedia {
    pub fn new(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_frame() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "streamSid": "MZ123",
                "accountSid": "AC1",
                "callSid": "CA9",
                "tracks": ["inbound"],
                "customParameters": {"interviewId": "int-7", "from": "+358"},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            },
            "streamSid": "MZ123"
        }"#;
        match serde_json::from_str::<MediaStreamEvent>(json).unwrap() {
            MediaStreamEvent::Start { start, stream_sid } => {
                assert_eq!(start.stream_sid, "MZ123");
                assert_eq!(start.call_sid, "CA9");
                assert_eq!(start.interview_id(), Some("int-7"));
                assert_eq!(stream_sid.as_deref(), Some("MZ123"));
            }
            other => panic!("Expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_media_and_stop_frames() {
        let media: MediaStreamEvent = serde_json::from_str(
            r#"{"event":"media","streamSid":"MZ1","media":{"track":"inbound","chunk":"2","timestamp":"5","payload":"/v7+"}}"#,
        )
        .unwrap();
        assert_eq!(
            media,
            MediaStreamEvent::Media {
                media: MediaPayload {
                    payload: "/v7+".to_string()
                }
            }
        );

        let stop: MediaStreamEvent =
            serde_json::from_str(r#"{"event":"stop","streamSid":"MZ1","stop":{}}"#).unwrap();
        assert_eq!(stop, MediaStreamEvent::Stop);

        let dtmf: MediaStreamEvent =
            serde_json::from_str(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap();
        assert_eq!(dtmf, MediaStreamEvent::Other);
    }

    #[test]
    fn test_outbound_media_shape() {
        let json = serde_json::to_value(OutboundMedia::new("MZ1", "AAAA")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AAAA"}})
        );
    }
}
