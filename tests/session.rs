//! Stream session lifecycle tests with async chunk sources

mod common;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use common::GO_CHUNKS;
use streamlight::error::HighlightError;
use streamlight::session::{ChannelReader, ChunkReader, StreamOptions, StreamReader, StreamSession};
use streamlight::syntax::{TokenBatch, TokenBuffer};

fn go_session() -> StreamSession {
    StreamSession::new(StreamOptions {
        language: Some("go".to_string()),
        theme: None,
        allow_recalls: true,
    })
}

/// Never yields a chunk; records when its lock is released
struct PendingReader {
    released: Arc<AtomicBool>,
}

#[async_trait]
impl ChunkReader for PendingReader {
    async fn read(&mut self) -> io::Result<Option<String>> {
        std::future::pending().await
    }

    fn release_lock(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_process_stream_from_channel() {
    let (tx, rx) = mpsc::channel(4);
    let producer = tokio::spawn(async move {
        for chunk in GO_CHUNKS {
            tx.send(chunk.to_string()).await.unwrap();
        }
    });

    let mut session = go_session();
    session.process_stream(ChannelReader::new(rx)).await.unwrap();
    producer.await.unwrap();

    assert_eq!(session.content(), GO_CHUNKS.concat());
    assert!(!session.is_streaming());
    assert!(session.transform().is_none());
}

#[tokio::test]
async fn test_empty_chunks_are_appended_verbatim() {
    let (tx, rx) = mpsc::channel(8);
    for chunk in ["", "a", "", "b\n", ""] {
        tx.send(chunk.to_string()).await.unwrap();
    }
    drop(tx);

    let mut session = StreamSession::default();
    session.process_stream(ChannelReader::new(rx)).await.unwrap();
    assert_eq!(session.content(), "ab\n");
}

#[tokio::test]
async fn test_read_error_ends_stream() {
    let chunks = futures::stream::iter(vec![
        Ok("fn ".to_string()),
        Err(io::Error::other("connection reset")),
        Ok("never".to_string()),
    ]);

    let mut session = StreamSession::default();
    let err = session
        .process_stream(StreamReader::new(chunks))
        .await
        .unwrap_err();

    assert!(matches!(err, HighlightError::Source(_)));
    assert!(!session.is_streaming());
    assert_eq!(session.content(), "fn ");
}

#[tokio::test]
async fn test_cancellation_releases_reader_and_ends_stream() {
    let released = Arc::new(AtomicBool::new(false));
    let reader = PendingReader {
        released: Arc::clone(&released),
    };

    let mut session = StreamSession::default();
    let outcome =
        tokio::time::timeout(Duration::from_millis(20), session.process_stream(reader)).await;

    assert!(outcome.is_err(), "process_stream should still be pending");
    assert!(released.load(Ordering::SeqCst));
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn test_initialization_failure_leaves_reader_untouched() {
    let released = Arc::new(AtomicBool::new(false));
    let reader = PendingReader {
        released: Arc::clone(&released),
    };

    let mut session = StreamSession::new(StreamOptions {
        theme: Some("no-such-theme".to_string()),
        ..StreamOptions::default()
    });
    let err = session.process_stream(reader).await.unwrap_err();

    assert!(matches!(err, HighlightError::Initialization(_)));
    assert!(!session.is_streaming());
    assert!(!released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stream_reader_then_feed_new_session() {
    let chunks = futures::stream::iter(GO_CHUNKS.map(|chunk| Ok::<_, io::Error>(chunk.to_string())));
    let mut session = go_session();
    session.process_stream(StreamReader::new(chunks)).await.unwrap();

    // A later session on the same controller starts clean
    session.start_stream().unwrap();
    assert_eq!(session.content(), "");

    let mut buffer = TokenBuffer::new();
    let mut batches = Vec::new();
    for chunk in GO_CHUNKS {
        batches.extend(session.feed(chunk));
    }
    batches.extend(session.finish());
    buffer.extend(batches.iter().cloned());

    assert_eq!(buffer.text(), GO_CHUNKS.concat());
    assert!(batches
        .iter()
        .any(|batch| matches!(batch, TokenBatch::Recall(_))));
}
