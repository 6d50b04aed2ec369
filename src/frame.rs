//! Outbound audio frame encoding.
//!
//! Every audio chunk sent to the engine is wrapped in a small envelope:
//! a 4 byte little-endian length prefix for a UTF-8 JSON metadata blob,
//! followed by the blob itself, followed by the raw PCM payload. The
//! metadata currently carries only the sample rate.
//!
//! ```text
//! [len: u32 LE][{"sampleRate": <int>}][raw PCM bytes]
//! ```
//!
//! [`decode_frame`] exists for the receiving side of the protocol; the
//! client only ever encodes, but mock engines in tests need to take frames
//! apart again.

use serde::{Deserialize, Serialize};

/// Metadata blob that prefixes every outbound audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Sample rate of the audio payload in Hz.
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
}

/// A decoded outbound frame, borrowing the payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Sample rate advertised in the metadata header.
    pub sample_rate: u32,
    /// Raw audio payload.
    pub audio: &'a [u8],
}

/// Error types for frame decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    /// The buffer is shorter than the 4 byte length prefix.
    #[error("frame shorter than the 4 byte length prefix")]
    MissingLengthPrefix,
    /// The length prefix claims more metadata bytes than the buffer holds.
    #[error("metadata length {expected} exceeds the {actual} remaining bytes")]
    TruncatedMetadata { expected: usize, actual: usize },
    /// The metadata blob is not valid JSON of the expected shape.
    #[error("invalid metadata json: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
}

/// Encode one audio chunk into the engine's wire frame.
///
/// Stateless; one frame per call, no chunking or batching.
pub fn encode_frame(sample_rate: u32, audio_chunk: &[u8]) -> Vec<u8> {
    let metadata = serde_json::json!({ "sampleRate": sample_rate }).to_string();

    let mut frame = Vec::with_capacity(4 + metadata.len() + audio_chunk.len());
    frame.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    frame.extend_from_slice(metadata.as_bytes());
    frame.extend_from_slice(audio_chunk);
    frame
}

/// Decode a wire frame back into its sample rate and audio payload.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame<'_>, FrameDecodeError> {
    if frame.len() < 4 {
        return Err(FrameDecodeError::MissingLengthPrefix);
    }

    let metadata_len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let rest = &frame[4..];
    if rest.len() < metadata_len {
        return Err(FrameDecodeError::TruncatedMetadata {
            expected: metadata_len,
            actual: rest.len(),
        });
    }

    let (metadata_bytes, audio) = rest.split_at(metadata_len);
    let metadata: FrameMetadata = serde_json::from_slice(metadata_bytes)?;

    Ok(DecodedFrame {
        sample_rate: metadata.sample_rate,
        audio,
    })
}
