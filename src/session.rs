//! Stream session controller
//!
//! Owns the lifecycle of one streaming-highlight session: the accumulated
//! text, the streaming flag and the active [`TokenTransform`]. The tokenizer
//! is built on the first `start_stream` and reused by every later session of
//! the same controller.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::config::StreamlightConfig;
use crate::error::{HighlightError, Result};
use crate::syntax::{LanguageId, TokenBatch, TokenTransform, Tokenizer};
use crate::theme::FALLBACK_THEME;

/// Language used when none is requested
pub const DEFAULT_LANGUAGE: &str = "text";

/// Session construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    pub language: Option<String>,
    pub theme: Option<String>,
    pub allow_recalls: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            language: None,
            theme: None,
            allow_recalls: true,
        }
    }
}

impl StreamOptions {
    pub fn from_config(config: &StreamlightConfig) -> Self {
        Self {
            language: Some(config.language.clone()),
            theme: Some(config.theme.clone()),
            allow_recalls: config.allow_recalls,
        }
    }

    pub fn language_name(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn theme_id(&self) -> &str {
        self.theme.as_deref().unwrap_or(FALLBACK_THEME)
    }
}

/// Pull-based source of text chunks
#[async_trait]
pub trait ChunkReader: Send {
    /// Next chunk, `None` once the source is exhausted
    async fn read(&mut self) -> io::Result<Option<String>>;

    /// Stop reading; called exactly once when the session is done with the source
    fn release_lock(&mut self);
}

/// Reads chunks sent over a tokio channel by a producer task
pub struct ChannelReader {
    rx: mpsc::Receiver<String>,
    locked: bool,
}

impl ChannelReader {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx, locked: true }
    }
}

#[async_trait]
impl ChunkReader for ChannelReader {
    async fn read(&mut self) -> io::Result<Option<String>> {
        if !self.locked {
            return Err(io::Error::other("reader lock released"));
        }
        Ok(self.rx.recv().await)
    }

    fn release_lock(&mut self) {
        self.locked = false;
        // Producers see a closed channel instead of blocking forever
        self.rx.close();
    }
}

/// Reads chunks from any fallible stream
pub struct StreamReader<S> {
    stream: Option<S>,
}

impl<S> StreamReader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }
}

#[async_trait]
impl<S> ChunkReader for StreamReader<S>
where
    S: Stream<Item = io::Result<String>> + Unpin + Send,
{
    async fn read(&mut self) -> io::Result<Option<String>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await.transpose(),
            None => Err(io::Error::other("reader lock released")),
        }
    }

    fn release_lock(&mut self) {
        self.stream = None;
    }
}

/// Holds a reader for the duration of a pull loop and releases it on drop
struct ReaderLock<R: ChunkReader> {
    reader: R,
}

impl<R: ChunkReader> Drop for ReaderLock<R> {
    fn drop(&mut self) {
        self.reader.release_lock();
    }
}

/// Ends the session on drop, whichever way the pull loop exits
struct ActiveStream<'a> {
    session: &'a mut StreamSession,
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        self.session.end_stream();
    }
}

#[derive(Debug)]
pub struct StreamSession {
    options: StreamOptions,
    content: String,
    streaming: bool,
    /// Built once, shared by every transform of this controller
    tokenizer: Option<Arc<Tokenizer>>,
    transform: Option<TokenTransform>,
}

impl StreamSession {
    pub fn new(options: StreamOptions) -> Self {
        Self {
            options,
            content: String::new(),
            streaming: false,
            tokenizer: None,
            transform: None,
        }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Text accumulated by the current (or last) session
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn transform(&self) -> Option<&TokenTransform> {
        self.transform.as_ref()
    }

    pub fn transform_mut(&mut self) -> Option<&mut TokenTransform> {
        self.transform.as_mut()
    }

    fn init_tokenizer(&mut self) -> Result<Arc<Tokenizer>> {
        if let Some(tokenizer) = &self.tokenizer {
            return Ok(Arc::clone(tokenizer));
        }

        let tokenizer = Arc::new(Tokenizer::new(
            [self.options.theme_id()],
            [self.options.language_name()],
        )?);
        self.tokenizer = Some(Arc::clone(&tokenizer));
        Ok(tokenizer)
    }

    /// Begin a fresh session, discarding any in-flight one
    pub fn start_stream(&mut self) -> Result<()> {
        let tokenizer = self.init_tokenizer()?;
        let language = LanguageId::from_name(self.options.language_name()).ok_or_else(|| {
            HighlightError::Initialization(format!(
                "unsupported language: {}",
                self.options.language_name()
            ))
        })?;
        let transform = TokenTransform::new(
            tokenizer,
            language,
            self.options.theme_id(),
            self.options.allow_recalls,
        )?;

        if self.streaming {
            tracing::debug!(
                "Restarting stream, discarding {} buffered bytes",
                self.content.len()
            );
        }
        self.streaming = true;
        self.content.clear();
        self.transform = Some(transform);

        tracing::debug!(
            language = self.options.language_name(),
            theme = self.options.theme_id(),
            allow_recalls = self.options.allow_recalls,
            "stream started"
        );
        Ok(())
    }

    /// Append a chunk verbatim; ignored unless streaming
    pub fn append_content(&mut self, chunk: &str) {
        if !self.streaming {
            tracing::trace!("append while not streaming, dropping {} bytes", chunk.len());
            return;
        }
        self.content.push_str(chunk);
    }

    /// Append a chunk and run it through the active transform
    pub fn feed(&mut self, chunk: &str) -> Vec<TokenBatch> {
        if !self.streaming {
            return Vec::new();
        }
        self.append_content(chunk);
        self.transform
            .as_mut()
            .map(|transform| transform.push(chunk))
            .unwrap_or_default()
    }

    /// Flush the active transform at end of input
    pub fn finish(&mut self) -> Vec<TokenBatch> {
        if !self.streaming {
            return Vec::new();
        }
        self.transform
            .as_mut()
            .map(TokenTransform::flush)
            .unwrap_or_default()
    }

    /// Stop streaming and drop the transform. Safe to call at any time.
    pub fn end_stream(&mut self) {
        if self.streaming {
            tracing::debug!(bytes = self.content.len(), "stream ended");
        }
        self.streaming = false;
        self.transform = None;
    }

    /// Start a session, append every chunk from `reader`, then end it.
    ///
    /// The reader is released and the session ended on every exit path,
    /// including read errors and cancellation of the returned future.
    pub async fn process_stream<R: ChunkReader>(&mut self, reader: R) -> Result<()> {
        self.start_stream()?;

        // Dropped in reverse order: release the reader, then end the stream
        let active = ActiveStream { session: self };
        let mut lock = ReaderLock { reader };

        while let Some(chunk) = lock.reader.read().await? {
            active.session.append_content(&chunk);
        }
        Ok(())
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(StreamOptions::default())
    }
}
