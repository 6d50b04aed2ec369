//! Realtime STT WebSocket session.
//!
//! This module contains the `RealtimeStt` session that bridges raw audio
//! producers to the engine and the engine's notifications back to event
//! consumers. It manages:
//! - lazy, on-demand WebSocket connection establishment
//! - outbound audio framing and writes
//! - a standing receive loop producing typed transcription events
//!
//! # Architecture
//!
//! The session coordinates two independent concurrent contexts through a
//! pair of latched signals rather than direct coupling:
//!
//! ```text
//! ┌──────────────────┐  ensure/send   ┌─────────────────────┐
//! │   send_audio()   │───────────────▶│  connection handle  │
//! └──────────────────┘                └──────────┬──────────┘
//!          │ sets *ready* on connect             │ inbound messages
//!          ▼                                     ▼
//! ┌──────────────────┐   wakes on     ┌─────────────────────┐
//! │  ready / closed  │───────────────▶│    receive loop     │──▶ SttEvent
//! │  watch signals   │                │  (lazy event stream)│
//! └──────────────────┘                └─────────────────────┘
//! ```
//!
//! The receive loop blocks on the signals between connection cycles, so
//! sending and receiving never poll each other. `close()` latches the
//! *closed* signal permanently; the loop observes it at its next wake and
//! terminates the event stream cleanly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::stream;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tracing::{debug, info, warn};

use crate::base::{SttError, SttEvent};
use crate::config::RealtimeSttConfig;
use crate::frame::encode_frame;
use crate::messages::ServerMessage;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Outbound half of the current connection, owned exclusively by the
/// session. Replaced, never mutated, on reconnect.
struct ActiveConnection {
    sink: WsSink,
    /// Cleared once the connection is observed dead, either by the receive
    /// loop finishing its drain or by a failed write.
    live: Arc<AtomicBool>,
}

/// Inbound half of a freshly established connection, parked until the
/// receive loop picks it up.
struct ParkedReader {
    source: WsSource,
    live: Arc<AtomicBool>,
}

/// State shared between the session handle and the event stream it
/// produces.
struct SessionShared {
    conn: Mutex<Option<ActiveConnection>>,
    reader_slot: Mutex<Option<ParkedReader>>,
    /// Latched high when a fresh connection exists that the receive loop
    /// has not started draining yet.
    ready: watch::Sender<bool>,
    /// Latched high by `close()`; never cleared again.
    closed: watch::Sender<bool>,
}

/// Streaming client session for the realtime STT engine.
///
/// One session per logical STT interaction. The connection is established
/// lazily by the first [`send_audio`](Self::send_audio) (or an explicit
/// [`ensure_connection`](Self::ensure_connection)); the receive loop from
/// [`receive_events`](Self::receive_events) runs independently and picks
/// up each connection as it appears. After [`close`](Self::close) the
/// session is terminal and every further connect or send attempt fails
/// with [`SttError::AlreadyClosed`].
pub struct RealtimeStt {
    config: RealtimeSttConfig,
    shared: Arc<SessionShared>,
}

impl RealtimeStt {
    /// Create a new session with the given configuration.
    pub fn new(config: RealtimeSttConfig) -> Result<Self, SttError> {
        config.validate()?;

        let (ready, _) = watch::channel(false);
        let (closed, _) = watch::channel(false);

        Ok(Self {
            config,
            shared: Arc::new(SessionShared {
                conn: Mutex::new(None),
                reader_slot: Mutex::new(None),
                ready,
                closed,
            }),
        })
    }

    /// Create a session with the default endpoint and sample rate.
    pub fn with_defaults() -> Self {
        let (ready, _) = watch::channel(false);
        let (closed, _) = watch::channel(false);

        Self {
            config: RealtimeSttConfig::default(),
            shared: Arc::new(SessionShared {
                conn: Mutex::new(None),
                reader_slot: Mutex::new(None),
                ready,
                closed,
            }),
        }
    }

    /// The sample rate this session advertises to the engine.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// The session configuration.
    #[inline]
    pub fn config(&self) -> &RealtimeSttConfig {
        &self.config
    }

    /// Check whether a live connection to the engine currently exists.
    pub async fn is_ready(&self) -> bool {
        self.shared
            .conn
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| active.live.load(Ordering::Acquire))
    }

    /// Establish the connection to the engine if none is live.
    ///
    /// Idempotent: a live connection is left untouched. Fails with
    /// [`SttError::AlreadyClosed`] after [`close`](Self::close) and with
    /// [`SttError::ConnectionFailed`] if the handshake fails; there is no
    /// automatic retry.
    pub async fn ensure_connection(&self) -> Result<(), SttError> {
        let _conn = self.ensure_live_connection().await?;
        Ok(())
    }

    /// Frame one audio chunk and write it to the engine.
    ///
    /// Connects on demand via [`ensure_connection`](Self::ensure_connection).
    /// Each call is exactly one wire write; no buffering or batching. A
    /// write against a connection the remote dropped between ensure and
    /// write surfaces as [`SttError::SendFailed`].
    pub async fn send_audio(&self, audio_chunk: &[u8]) -> Result<(), SttError> {
        let frame = encode_frame(self.config.sample_rate, audio_chunk);

        let mut conn = self.ensure_live_connection().await?;
        let active = match conn.as_mut() {
            Some(active) => active,
            None => {
                return Err(SttError::ConnectionFailed(
                    "connection handle missing after connect".to_string(),
                ));
            }
        };

        if let Err(e) = active.sink.send(Message::Binary(frame.into())).await {
            active.live.store(false, Ordering::Release);
            warn!("failed to write audio frame: {e}");
            return Err(SttError::SendFailed(e.to_string()));
        }

        debug!("sent {} byte audio chunk", audio_chunk.len());
        Ok(())
    }

    /// Close the session permanently.
    ///
    /// Best effort: failures while closing the underlying connection are
    /// not distinguished from success. Idempotent. A running receive loop
    /// observes the closed signal at its next wake and terminates its
    /// event stream without error.
    pub async fn close(&self) {
        let mut conn = self.shared.conn.lock().await;
        if let Some(mut active) = conn.take() {
            if let Err(e) = active.sink.send(Message::Close(None)).await {
                debug!("close frame not delivered: {e}");
            }
            active.live.store(false, Ordering::Release);
        }
        drop(conn);

        // Drop an undrained reader half so the socket actually closes.
        self.shared.reader_slot.lock().await.take();

        self.shared.closed.send_replace(true);
        info!("realtime stt session closed");
    }

    /// Produce the lazy stream of transcription events.
    ///
    /// The stream blocks until either a connection becomes ready or the
    /// session is closed, drains each connection's messages in wire order,
    /// and re-blocks when the remote end closes. Malformed JSON and
    /// unrecognized message types are logged and skipped without ending
    /// the stream; only [`close`](Self::close) terminates it.
    ///
    /// Driven entirely by whoever polls it; one stream per session is the
    /// intended use.
    pub fn receive_events(&self) -> impl Stream<Item = SttEvent> + Send + 'static {
        let shared = Arc::clone(&self.shared);

        stream! {
            let mut closed_rx = shared.closed.subscribe();
            let mut ready_rx = shared.ready.subscribe();

            loop {
                // Level-triggered wait: wake on whichever signal is (or
                // becomes) set first, then re-check closed to resolve races.
                let wake = tokio::select! {
                    res = closed_rx.wait_for(|closed| *closed) => res.map(|_| ()),
                    res = ready_rx.wait_for(|ready| *ready) => res.map(|_| ()),
                };

                if wake.is_err() || *closed_rx.borrow() {
                    break;
                }

                // Consume the ready latch before draining so a later
                // connection cycle can raise it again without waking this
                // loop for the connection it is already reading.
                shared.ready.send_replace(false);

                let mut parked = match shared.reader_slot.lock().await.take() {
                    Some(parked) => parked,
                    None => continue,
                };

                debug!("draining messages from realtime stt connection");
                while let Some(next) = parked.source.next().await {
                    match next {
                        Ok(Message::Text(text)) => match ServerMessage::parse(&text) {
                            Ok(ServerMessage::Realtime(msg)) => {
                                yield SttEvent::Chunk(msg.text);
                            }
                            Ok(ServerMessage::FullSentence(msg)) => {
                                yield SttEvent::Output(msg.text);
                            }
                            Ok(ServerMessage::RecordingStart | ServerMessage::RecordingStop) => {
                                debug!("recording lifecycle marker received");
                            }
                            Ok(ServerMessage::Unknown(kind)) => {
                                warn!("unhandled message type {kind}");
                            }
                            Err(e) => {
                                warn!("skipping undecodable message: {e}");
                            }
                        },
                        Ok(Message::Close(frame)) => {
                            info!("engine closed the connection: {frame:?}");
                            break;
                        }
                        Ok(_) => {
                            debug!("ignoring non-text message from engine");
                        }
                        Err(e) => {
                            warn!("connection error while draining: {e}");
                            break;
                        }
                    }
                }

                parked.live.store(false, Ordering::Release);
                info!("realtime stt connection ended, waiting for the next one");
            }
        }
    }

    /// Lock the connection slot and make sure it holds a live connection,
    /// establishing one if necessary. The returned guard always holds
    /// `Some` on success.
    async fn ensure_live_connection(
        &self,
    ) -> Result<MutexGuard<'_, Option<ActiveConnection>>, SttError> {
        let mut conn = self.shared.conn.lock().await;

        if *self.shared.closed.borrow() {
            return Err(SttError::AlreadyClosed);
        }

        if conn
            .as_ref()
            .is_some_and(|active| active.live.load(Ordering::Acquire))
        {
            return Ok(conn);
        }

        debug!("connecting to realtime stt engine at {}", self.config.endpoint);
        let (ws, _response) = connect_async(self.config.endpoint.as_str())
            .await
            .map_err(|e| SttError::ConnectionFailed(e.to_string()))?;
        info!("connected to realtime stt engine");

        let (sink, source) = ws.split();
        let live = Arc::new(AtomicBool::new(true));

        *conn = Some(ActiveConnection {
            sink,
            live: Arc::clone(&live),
        });
        *self.shared.reader_slot.lock().await = Some(ParkedReader { source, live });

        // Signal the receive loop that a fresh connection is up.
        self.shared.ready.send_replace(true);

        Ok(conn)
    }
}
