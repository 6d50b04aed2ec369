//! Streaming client for a realtime speech-to-text engine.
//!
//! This crate bridges a continuous audio feed to an STT engine reachable
//! over a persistent WebSocket connection and turns the engine's
//! asynchronous notifications into a typed stream of transcription events:
//!
//! - Lazy, on-demand connection establishment driven by the first audio send
//! - Outbound audio framing with a JSON metadata header
//! - A standing receive loop yielding [`SttEvent::Chunk`] for interim
//!   transcripts and [`SttEvent::Output`] for final ones
//!
//! The crate is organized into focused modules:
//!
//! - `base`: event and error types
//! - `config`: session configuration
//! - `frame`: the outbound wire framing
//! - `messages`: inbound message taxonomy and parsing
//! - `client`: the [`RealtimeStt`] session itself
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use realtime_stt::{RealtimeStt, RealtimeSttConfig, SttEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = RealtimeStt::new(RealtimeSttConfig::default())?;
//!
//!     // Consume transcription events from an independent task.
//!     let mut events = Box::pin(session.receive_events());
//!     let consumer = tokio::spawn(async move {
//!         while let Some(event) = events.next().await {
//!             match event {
//!                 SttEvent::Chunk(text) => println!("partial: {text}"),
//!                 SttEvent::Output(text) => println!("final: {text}"),
//!             }
//!         }
//!     });
//!
//!     // Sending connects on demand.
//!     let audio_chunk = vec![0u8; 1024];
//!     session.send_audio(&audio_chunk).await?;
//!
//!     session.close().await;
//!     consumer.await?;
//!     Ok(())
//! }
//! ```

mod base;
mod client;
mod config;
mod frame;
mod messages;


pub use base::{SttError, SttEvent};
pub use client::RealtimeStt;
pub use config::{DEFAULT_ENDPOINT, DEFAULT_SAMPLE_RATE, RealtimeSttConfig};
pub use frame::{DecodedFrame, FrameDecodeError, FrameMetadata, decode_frame, encode_frame};
pub use messages::{ServerMessage, TranscriptMessage};
