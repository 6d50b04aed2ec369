//! Shared event and error types for the realtime STT client.

/// Transcription event produced by the session's receive loop.
///
/// The engine emits interim transcripts while an utterance is still in
/// progress and a final transcript once a sentence is committed. Both carry
/// exactly the transcript string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttEvent {
    /// Interim transcript for the utterance in progress. The text may change
    /// as more audio is processed.
    Chunk(String),
    /// Final transcript for a completed sentence.
    Output(String),
}

impl SttEvent {
    /// The transcript text carried by this event.
    pub fn text(&self) -> &str {
        match self {
            Self::Chunk(text) | Self::Output(text) => text,
        }
    }

    /// Whether this event is a final transcript.
    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Output(_))
    }
}

/// Error types for session operations.
///
/// Inbound decode failures are never surfaced through this type; they are
/// logged and skipped by the receive loop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SttError {
    /// The session was closed; no further connections are permitted.
    #[error("session already closed")]
    AlreadyClosed,
    /// The WebSocket handshake with the engine failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Writing an audio frame to the engine failed.
    #[error("send failed: {0}")]
    SendFailed(String),
    /// The session configuration is invalid.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
