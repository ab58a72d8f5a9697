//! Audio codec for the relay boundaries.
//!
//! Converts between the representations used on either side of a relay:
//!
//! - float samples in `[-1, 1]` captured by a browser microphone
//! - PCM 16-bit signed little-endian bytes (mono, 24kHz)
//! - base64 text carried in realtime model events
//! - a self-contained WAV container for playback devices that need whole files
//!
//! The container path is write-only. Agent speech is only ever packaged for
//! playback, never parsed back.

use base64::prelude::*;
use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error;

/// Sample rate agreed with the upstream model for PCM16 sessions.
pub const SAMPLE_RATE: u32 = 24000;

/// Channel count of every frame handled by the codec.
pub const CHANNELS: u16 = 1;

/// Bits per PCM sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Length of the canonical RIFF/WAVE header emitted by [`wrap_as_playable_container`].
pub const WAV_HEADER_LEN: usize = 44;

/// Number of samples converted per window in [`encode_for_transport`].
///
/// Multiple of three so every full window encodes to whole base64 quanta and the
/// concatenated output has no interior padding.
pub const ENCODE_WINDOW_SAMPLES: usize = 3 * 8192;

/// Errors raised by codec operations.
#[derive(Debug, Error)]
pub enum AudioCodecError {
    /// Transport frame was not valid base64
    #[error("Invalid base64 audio frame: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Binary float frame length is not a whole number of samples
    #[error("Float frame length {0} is not a multiple of 4 bytes")]
    MisalignedFloatFrame(usize),

    /// Container writer failed
    #[error("Failed to build audio container: {0}")]
    Container(#[from] hound::Error),
}

/// Quantize one float sample to PCM16.
///
/// Negative samples scale by 32768 and non-negative ones by 32767, so both ends
/// of the clamped range map onto the full signed 16-bit range.
#[inline]
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    // `as` truncates toward zero and maps NaN to 0
    scaled as i16
}

/// Convert float samples to PCM16 little-endian bytes.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&quantize_sample(sample).to_le_bytes());
    }
    out
}

/// Read PCM16 little-endian bytes back into samples. A trailing odd byte is ignored.
pub fn pcm16_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode float microphone samples for transport.
///
/// Samples are clamped, quantized, packed little-endian and base64-encoded in
/// bounded windows so no intermediate buffer grows with the input length.
pub fn encode_for_transport(samples: &[f32]) -> String {
    let mut encoded = String::with_capacity(samples.len().div_ceil(3) * 8);
    let mut window = Vec::with_capacity(ENCODE_WINDOW_SAMPLES.min(samples.len()) * 2);

    for chunk in samples.chunks(ENCODE_WINDOW_SAMPLES) {
        window.clear();
        for &sample in chunk {
            window.extend_from_slice(&quantize_sample(sample).to_le_bytes());
        }
        BASE64_STANDARD.encode_string(&window, &mut encoded);
    }

    encoded
}

/// Encode raw PCM bytes for transport.
pub fn encode_pcm_for_transport(pcm: &[u8]) -> String {
    BASE64_STANDARD.encode(pcm)
}

/// Decode a transport frame back into raw PCM bytes.
///
/// Only base64 well-formedness is checked; the upstream model is trusted to emit
/// whole frames.
pub fn decode_from_transport(encoded: &str) -> Result<Bytes, AudioCodecError> {
    Ok(Bytes::from(BASE64_STANDARD.decode(encoded)?))
}

/// Decode a binary client frame of little-endian float32 samples.
pub fn f32_frame_from_le_bytes(frame: &[u8]) -> Result<Vec<f32>, AudioCodecError> {
    if frame.len() % 4 != 0 {
        return Err(AudioCodecError::MisalignedFloatFrame(frame.len()));
    }
    Ok(frame
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Wrap PCM16 bytes in a 44-byte WAV header (mono, 16-bit, 24kHz).
///
/// An odd trailing byte is not a whole sample and is dropped. The header's data
/// size always equals the payload actually emitted, and the RIFF size equals
/// `36 + payload`.
pub fn wrap_as_playable_container(pcm: &[u8]) -> Result<Vec<u8>, AudioCodecError> {
    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let payload_len = pcm.len() & !1;
    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + payload_len));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
