//! Incremental token transform
//!
//! Turns a sequence of text chunks into a sequence of token batches. Each
//! chunk is applied to the previous syntax tree as an append edit and
//! reparsed incrementally, so grammar state carries across chunk boundaries.
//!
//! With recalls enabled, every chunk produces tokens up to the end of the
//! buffer. Tokens whose classification changed are retracted with
//! [`TokenBatch::Recall`] and re-issued. The token touching the end of the
//! buffer is provisional and is always retracted once more text arrives.
//!
//! With recalls disabled, only complete lines are emitted and an emitted
//! token is final.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tree_sitter::{InputEdit, Parser, Point, Tree};

use super::highlights::HighlightSpan;
use super::languages::LanguageId;
use super::tokenizer::{advance_point, Tokenizer};
use crate::error::Result;
use crate::theme::{Color, Theme};

/// A token ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemedToken {
    pub content: String,
    /// Byte offset of `content` in the streamed text
    pub offset: usize,
    /// Capture name, `None` for unhighlighted text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// One unit of transform output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBatch {
    /// Newly tokenized content, appended after the live tokens
    Tokens(Vec<ThemedToken>),
    /// Retract this many of the most recently emitted live tokens
    Recall(usize),
}

pub struct TokenTransform {
    tokenizer: Arc<Tokenizer>,
    language: LanguageId,
    theme: Arc<Theme>,
    allow_recalls: bool,
    /// `None` for plain text
    parser: Option<Parser>,
    tree: Option<Tree>,
    source: String,
    /// Position of the end of `source`
    end_point: Point,
    /// Tokens the consumer currently holds (recall mode only)
    live: Vec<HighlightSpan>,
    /// Bytes delivered so far
    delivered: usize,
    finished: bool,
}

impl TokenTransform {
    /// Bind a transform to a loaded language and theme
    pub fn new(
        tokenizer: Arc<Tokenizer>,
        language: LanguageId,
        theme: &str,
        allow_recalls: bool,
    ) -> Result<Self> {
        let theme = tokenizer.theme(theme)?;
        let parser = tokenizer.parser(language)?;
        Ok(Self {
            tokenizer,
            language,
            theme,
            allow_recalls,
            parser,
            tree: None,
            source: String::new(),
            end_point: Point { row: 0, column: 0 },
            live: Vec::new(),
            delivered: 0,
            finished: false,
        })
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn allow_recalls(&self) -> bool {
        self.allow_recalls
    }

    /// Text pushed so far
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk and return the batches it produces
    pub fn push(&mut self, chunk: &str) -> Vec<TokenBatch> {
        if self.finished {
            tracing::warn!("chunk pushed after flush, ignoring {} bytes", chunk.len());
            return Vec::new();
        }
        if chunk.is_empty() {
            return Vec::new();
        }

        let changed_from = self.reparse(chunk);
        if self.allow_recalls {
            self.emit_with_recalls(changed_from, true)
        } else {
            let stable_end = self.source.rfind('\n').map_or(0, |idx| idx + 1);
            self.emit_stable(stable_end)
        }
    }

    /// Signal end of input and emit whatever is still pending
    pub fn flush(&mut self) -> Vec<TokenBatch> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let batches = if self.allow_recalls {
            self.emit_with_recalls(None, false)
        } else {
            self.emit_stable(self.source.len())
        };
        tracing::trace!(bytes = self.source.len(), "transform flushed");
        batches
    }

    /// Wrap a chunk iterator into a lazy batch iterator
    pub fn stream<I>(self, chunks: I) -> TokenStream<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        TokenStream {
            transform: self,
            chunks: chunks.into_iter(),
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Append `chunk` to the tree and reparse.
    ///
    /// Returns the earliest byte whose syntactic structure changed.
    fn reparse(&mut self, chunk: &str) -> Option<usize> {
        let start_byte = self.source.len();
        let start_position = self.end_point;
        self.source.push_str(chunk);
        self.end_point = advance_point(self.end_point, chunk);

        let parser = self.parser.as_mut()?;

        let mut old_tree = self.tree.take();
        if let Some(tree) = old_tree.as_mut() {
            tree.edit(&InputEdit {
                start_byte,
                old_end_byte: start_byte,
                new_end_byte: self.source.len(),
                start_position,
                old_end_position: start_position,
                new_end_position: self.end_point,
            });
        }

        let Some(new_tree) = parser.parse(&self.source, old_tree.as_ref()) else {
            tracing::error!("Parse failed for {:?}, emitting plain text", self.language);
            return Some(0);
        };

        let changed_from = old_tree.as_ref().and_then(|old| {
            old.changed_ranges(&new_tree)
                .map(|range| range.start_byte)
                .min()
        });
        tracing::trace!(
            "Incremental parse: appended {} bytes at {}, changed from {:?}",
            chunk.len(),
            start_byte,
            changed_from
        );

        self.tree = Some(new_tree);
        changed_from
    }

    /// Re-derive tokens from the first affected live token and diff them
    fn emit_with_recalls(&mut self, changed_from: Option<usize>, tail_provisional: bool) -> Vec<TokenBatch> {
        let len = self.source.len();
        let mut from = changed_from.unwrap_or(len).min(len);
        if tail_provisional {
            if let Some(last) = self.live.last() {
                from = from.min(last.start);
            }
        }

        let keep = self.live.partition_point(|span| span.end <= from);
        let window_start = if keep == 0 { 0 } else { self.live[keep - 1].end };
        let fresh = self.tokenizer.segment(
            self.language,
            &self.source,
            self.tree.as_ref(),
            window_start..len,
        );

        let mut same = fresh
            .iter()
            .zip(&self.live[keep..])
            .take_while(|(new, old)| new == old)
            .count();
        if tail_provisional && keep + same == self.live.len() && same > 0 {
            same -= 1;
        }

        let retained = keep + same;
        let mut batches = Vec::new();
        let recall = self.live.len() - retained;
        if recall > 0 {
            self.live.truncate(retained);
            batches.push(TokenBatch::Recall(recall));
        }

        let added = &fresh[same..];
        if !added.is_empty() {
            batches.push(TokenBatch::Tokens(self.themed(added)));
            self.live.extend_from_slice(added);
        }
        self.delivered = len;
        batches
    }

    /// Emit everything between the delivered mark and `stable_end`, final
    fn emit_stable(&mut self, stable_end: usize) -> Vec<TokenBatch> {
        if stable_end <= self.delivered {
            return Vec::new();
        }
        let spans = self.tokenizer.segment(
            self.language,
            &self.source,
            self.tree.as_ref(),
            self.delivered..stable_end,
        );
        self.delivered = stable_end;
        if spans.is_empty() {
            return Vec::new();
        }
        vec![TokenBatch::Tokens(self.themed(&spans))]
    }

    fn themed(&self, spans: &[HighlightSpan]) -> Vec<ThemedToken> {
        spans
            .iter()
            .map(|span| ThemedToken {
                content: self.source[span.start..span.end].to_string(),
                offset: span.start,
                scope: span.scope(),
                color: span.highlight.and_then(|id| self.theme.color_for(id)),
            })
            .collect()
    }
}

impl std::fmt::Debug for TokenTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenTransform")
            .field("language", &self.language)
            .field("theme", &self.theme.id)
            .field("allow_recalls", &self.allow_recalls)
            .field("bytes", &self.source.len())
            .field("live", &self.live.len())
            .field("finished", &self.finished)
            .finish()
    }
}

/// Lazy batch sequence over a chunk iterator.
///
/// Pulls one chunk at a time and flushes the transform once the chunks run
/// out. Not restartable: the transform is consumed with it.
pub struct TokenStream<I> {
    transform: TokenTransform,
    chunks: I,
    pending: VecDeque<TokenBatch>,
    exhausted: bool,
}

impl<I> Iterator for TokenStream<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = TokenBatch;

    fn next(&mut self) -> Option<TokenBatch> {
        loop {
            if let Some(batch) = self.pending.pop_front() {
                return Some(batch);
            }
            if self.exhausted {
                return None;
            }
            match self.chunks.next() {
                Some(chunk) => self.pending.extend(self.transform.push(chunk.as_ref())),
                None => {
                    self.exhausted = true;
                    self.pending.extend(self.transform.flush());
                }
            }
        }
    }
}

/// Consumer-side view of the live tokens, maintained by applying batches
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    tokens: Vec<ThemedToken>,
    recalls: usize,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, batch: TokenBatch) {
        match batch {
            TokenBatch::Tokens(tokens) => self.tokens.extend(tokens),
            TokenBatch::Recall(count) => {
                let keep = self.tokens.len().saturating_sub(count);
                self.tokens.truncate(keep);
                self.recalls += 1;
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = TokenBatch>>(&mut self, batches: I) {
        for batch in batches {
            self.apply(batch);
        }
    }

    pub fn tokens(&self) -> &[ThemedToken] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<ThemedToken> {
        self.tokens
    }

    /// Number of recall batches applied
    pub fn recall_count(&self) -> usize {
        self.recalls
    }

    /// Concatenated token content
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.content.as_str()).collect()
    }
}
