//! Integration tests driving a `RealtimeStt` session against an
//! in-process mock engine.
//!
//! Each test binds a WebSocket server on an ephemeral local port and
//! exercises one aspect of the session lifecycle: lazy connection,
//! framing on the wire, event mapping, terminal close, and resumption
//! after a server-side disconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::protocol::Message};

use realtime_stt::{RealtimeStt, RealtimeSttConfig, SttError, SttEvent, decode_frame};

fn config_for(port: u16) -> RealtimeSttConfig {
    RealtimeSttConfig {
        endpoint: format!("ws://127.0.0.1:{port}").parse().unwrap(),
        sample_rate: 16000,
    }
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

#[tokio::test]
async fn test_send_audio_frames_chunks_on_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<(u32, Vec<u8>)>();
    tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Binary(data) = msg {
                let decoded = decode_frame(&data).unwrap();
                let _ = frame_tx.send((decoded.sample_rate, decoded.audio.to_vec()));
            }
        }
    });

    let session = RealtimeStt::new(config_for(port)).unwrap();
    session.send_audio(b"chunk-one").await.unwrap();
    session.send_audio(b"chunk-two").await.unwrap();

    let (rate, audio) = timeout(Duration::from_secs(2), frame_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rate, 16000);
    assert_eq!(audio, b"chunk-one");

    let (rate, audio) = timeout(Duration::from_secs(2), frame_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rate, 16000);
    assert_eq!(audio, b"chunk-two");
}

#[tokio::test]
async fn test_ensure_connection_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let accepts = Arc::new(AtomicUsize::new(0));
    let accepts_server = accepts.clone();
    tokio::spawn(async move {
        loop {
            let mut ws = accept_ws(&listener).await;
            accepts_server.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move { while ws.next().await.is_some() {} });
        }
    });

    let session = RealtimeStt::new(config_for(port)).unwrap();
    assert!(!session.is_ready().await);

    session.ensure_connection().await.unwrap();
    assert!(session.is_ready().await);

    // A live connection is reused, both by ensure and by sends.
    session.ensure_connection().await.unwrap();
    session.send_audio(b"audio").await.unwrap();
    session.send_audio(b"more audio").await.unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_failure_is_surfaced_without_retry() {
    // Bind to learn a free port, then drop the listener so nothing answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = RealtimeStt::new(config_for(port)).unwrap();
    let result = session.send_audio(b"audio").await;
    assert!(matches!(result, Err(SttError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_close_makes_session_terminal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        while ws.next().await.is_some() {}
    });

    let session = RealtimeStt::new(config_for(port)).unwrap();
    session.ensure_connection().await.unwrap();

    session.close().await;
    assert!(!session.is_ready().await);

    // Every further attempt fails, including repeated ones.
    assert!(matches!(
        session.send_audio(b"audio").await,
        Err(SttError::AlreadyClosed)
    ));
    assert!(matches!(
        session.ensure_connection().await,
        Err(SttError::AlreadyClosed)
    ));
    assert!(matches!(
        session.send_audio(b"audio").await,
        Err(SttError::AlreadyClosed)
    ));

    // Closing again is a no-op.
    session.close().await;
    assert!(matches!(
        session.ensure_connection().await,
        Err(SttError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn test_close_before_first_connection_is_terminal() {
    let session = RealtimeStt::with_defaults();
    session.close().await;
    assert!(matches!(
        session.send_audio(b"audio").await,
        Err(SttError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn test_receive_loop_maps_messages_and_skips_garbage() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        let messages = [
            r#"{"type": "recording_start"}"#,
            r#"{"type": "realtime", "text": "hel"}"#,
            "{this is not json",
            r#"{"type": "vad_detect_start"}"#,
            r#"{"type": "fullSentence", "text": "hello"}"#,
            r#"{"type": "recording_stop"}"#,
        ];
        for msg in messages {
            ws.send(Message::Text(msg.into())).await.unwrap();
        }
        // Keep the connection open so the drain is ended by close(), not
        // by the server going away.
        while ws.next().await.is_some() {}
    });

    let session = RealtimeStt::new(config_for(port)).unwrap();
    let mut events = Box::pin(session.receive_events());

    // First send establishes the connection and wakes the loop.
    session.send_audio(b"audio").await.unwrap();

    let first = timeout(Duration::from_secs(2), events.next()).await.unwrap();
    assert_eq!(first, Some(SttEvent::Chunk("hel".to_string())));

    // The malformed message and the unknown type produce nothing; the next
    // event is the final transcript.
    let second = timeout(Duration::from_secs(2), events.next()).await.unwrap();
    assert_eq!(second, Some(SttEvent::Output("hello".to_string())));

    // Closing the session terminates the stream cleanly.
    let pending = tokio::spawn(async move { events.next().await });
    sleep(Duration::from_millis(50)).await;
    session.close().await;

    let tail = timeout(Duration::from_secs(2), pending).await.unwrap().unwrap();
    assert_eq!(tail, None);
}

#[tokio::test]
async fn test_close_while_waiting_terminates_stream() {
    let session = RealtimeStt::with_defaults();
    let mut events = Box::pin(session.receive_events());

    let pending = tokio::spawn(async move { events.next().await });
    sleep(Duration::from_millis(50)).await;

    session.close().await;

    let result = timeout(Duration::from_secs(1), pending).await.unwrap().unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_receive_loop_resumes_after_remote_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        // First connection: one final transcript, then a server-side close.
        let mut ws = accept_ws(&listener).await;
        ws.send(Message::Text(
            r#"{"type": "fullSentence", "text": "first"}"#.into(),
        ))
        .await
        .unwrap();
        ws.close(None).await.unwrap();

        // Second connection: another final transcript.
        let mut ws = accept_ws(&listener).await;
        ws.send(Message::Text(
            r#"{"type": "fullSentence", "text": "second"}"#.into(),
        ))
        .await
        .unwrap();
        while ws.next().await.is_some() {}
    });

    let session = RealtimeStt::new(config_for(port)).unwrap();
    let mut events = Box::pin(session.receive_events());

    session.send_audio(b"audio").await.unwrap();
    let first = timeout(Duration::from_secs(2), events.next()).await.unwrap();
    assert_eq!(first, Some(SttEvent::Output("first".to_string())));

    // Drive the stream past the dropped connection from a separate task;
    // it must re-enter the waiting state rather than end.
    let pending = tokio::spawn(async move { events.next().await });
    sleep(Duration::from_millis(100)).await;

    // The next send establishes a fresh connection and re-signals the loop.
    session.send_audio(b"more audio").await.unwrap();

    let second = timeout(Duration::from_secs(2), pending).await.unwrap().unwrap();
    assert_eq!(second, Some(SttEvent::Output("second".to_string())));
}
