//! Inbound WebSocket message types for the realtime STT engine.
//!
//! The engine sends flat JSON objects with a `type` discriminator:
//!
//! - `recording_start` / `recording_stop`: recording lifecycle markers,
//!   no transcript attached
//! - `realtime`: interim transcript with a `text` field
//! - `fullSentence`: final transcript with a `text` field
//!
//! Use [`ServerMessage::parse`] to deserialize incoming messages. Types the
//! client does not recognize map to [`ServerMessage::Unknown`] so the
//! receive loop can log and keep going.

use serde::Deserialize;

/// Transcript-bearing message (`realtime` or `fullSentence`).
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptMessage {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub message_type: String,
    /// The transcript text.
    pub text: String,
}

/// Enum over all messages the engine sends.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// The engine started capturing a speech segment.
    RecordingStart,
    /// The engine stopped capturing a speech segment.
    RecordingStop,
    /// Interim transcript, may still change.
    Realtime(TranscriptMessage),
    /// Final transcript for a committed sentence.
    FullSentence(TranscriptMessage),
    /// Unrecognized `type` value, kept for logging.
    Unknown(String),
}

impl ServerMessage {
    /// Parse a WebSocket text message into the appropriate type.
    ///
    /// Peeks at the `type` field first, then deserializes the full payload
    /// for transcript-bearing types. A missing or malformed `type` field,
    /// or a transcript message without `text`, is a parse error.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type")]
            message_type: String,
        }

        let peek: TypePeek = serde_json::from_str(text)?;

        match peek.message_type.as_str() {
            "recording_start" => Ok(ServerMessage::RecordingStart),
            "recording_stop" => Ok(ServerMessage::RecordingStop),
            "realtime" => {
                let msg: TranscriptMessage = serde_json::from_str(text)?;
                Ok(ServerMessage::Realtime(msg))
            }
            "fullSentence" => {
                let msg: TranscriptMessage = serde_json::from_str(text)?;
                Ok(ServerMessage::FullSentence(msg))
            }
            other => Ok(ServerMessage::Unknown(other.to_string())),
        }
    }

    /// Check if this message carries a final transcript.
    #[inline]
    pub fn is_final_transcript(&self) -> bool {
        matches!(self, ServerMessage::FullSentence(_))
    }
}
