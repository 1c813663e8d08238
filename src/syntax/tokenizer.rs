//! Shared tokenizer resource: grammars, compiled queries and themes
//!
//! A [`Tokenizer`] is built once for a set of languages and themes and is
//! never mutated afterwards, so it can be shared across sessions behind an
//! `Arc`. Parse state (parser, tree) lives in whoever drives it.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Point, Query, QueryCursor, Tree};

use super::highlights::{highlight_id_for_name, HighlightId, HighlightSpan};
use super::languages::LanguageId;
use crate::error::{HighlightError, Result};
use crate::theme::{load_theme, Theme, FALLBACK_THEME};

/// Compiled grammar for one language
struct Grammar {
    language: tree_sitter::Language,
    query: Query,
}

/// A query capture that survived filtering
#[derive(Debug, Clone)]
struct Capture {
    /// Byte range of the captured node
    range: Range<usize>,
    /// Pattern index within the query (lower wins for the same node)
    pattern: usize,
    highlight: HighlightId,
}

pub struct Tokenizer {
    /// Loaded languages, including plain text which has no grammar
    languages: Vec<LanguageId>,
    grammars: HashMap<LanguageId, Grammar>,
    themes: HashMap<String, Arc<Theme>>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("languages", &self.languages)
            .field("themes", &self.themes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Tokenizer {
    /// Build a tokenizer for the given theme ids and language names.
    ///
    /// Fails with [`HighlightError::Initialization`] when a language has no
    /// grammar or a theme cannot be loaded. An empty theme list loads the
    /// fallback theme.
    pub fn new<T, L>(themes: T, langs: L) -> Result<Self>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let mut tokenizer = Self {
            languages: Vec::new(),
            grammars: HashMap::new(),
            themes: HashMap::new(),
        };

        for name in langs {
            let name = name.as_ref();
            let lang = LanguageId::from_name(name).ok_or_else(|| {
                HighlightError::Initialization(format!("unsupported language: {}", name))
            })?;
            tokenizer.init_language(lang)?;
        }

        for id in themes {
            tokenizer.init_theme(id.as_ref())?;
        }
        if tokenizer.themes.is_empty() {
            tokenizer.init_theme(FALLBACK_THEME)?;
        }

        tracing::debug!(
            languages = ?tokenizer.languages,
            themes = ?tokenizer.themes.keys().collect::<Vec<_>>(),
            "tokenizer initialized"
        );
        Ok(tokenizer)
    }

    /// Initialize a language's grammar and query
    fn init_language(&mut self, lang: LanguageId) -> Result<()> {
        if self.languages.contains(&lang) {
            return Ok(());
        }

        if let Some((ts_lang, highlights_scm)) = lang.grammar() {
            // Fail early if the grammar ABI doesn't match the runtime
            let mut parser = Parser::new();
            parser.set_language(&ts_lang).map_err(|e| {
                HighlightError::Initialization(format!(
                    "failed to set language for {:?}: {}",
                    lang, e
                ))
            })?;

            let query = Query::new(&ts_lang, highlights_scm).map_err(|e| {
                HighlightError::Initialization(format!(
                    "failed to compile query for {:?}: {:?}",
                    lang, e
                ))
            })?;

            self.grammars.insert(
                lang,
                Grammar {
                    language: ts_lang,
                    query,
                },
            );
        }

        self.languages.push(lang);
        Ok(())
    }

    fn init_theme(&mut self, id: &str) -> Result<()> {
        if self.themes.contains_key(id) {
            return Ok(());
        }
        let theme = load_theme(id).map_err(HighlightError::Initialization)?;
        self.themes.insert(id.to_string(), Arc::new(theme));
        Ok(())
    }

    /// Whether `lang` was loaded at construction
    pub fn supports(&self, lang: LanguageId) -> bool {
        self.languages.contains(&lang)
    }

    pub fn languages(&self) -> &[LanguageId] {
        &self.languages
    }

    /// Look up a loaded theme
    pub fn theme(&self, id: &str) -> Result<Arc<Theme>> {
        self.themes.get(id).cloned().ok_or_else(|| {
            HighlightError::Initialization(format!("theme {} was not loaded", id))
        })
    }

    /// A fresh parser for `lang`, `None` for plain text
    pub(crate) fn parser(&self, lang: LanguageId) -> Result<Option<Parser>> {
        if !self.supports(lang) {
            return Err(HighlightError::Initialization(format!(
                "language {} was not loaded",
                lang.name()
            )));
        }

        let Some(grammar) = self.grammars.get(&lang) else {
            return Ok(None);
        };
        let mut parser = Parser::new();
        parser.set_language(&grammar.language).map_err(|e| {
            HighlightError::Initialization(format!("failed to set language for {:?}: {}", lang, e))
        })?;
        Ok(Some(parser))
    }

    /// Tokenize a complete string in one pass
    pub fn tokenize(&self, lang: LanguageId, source: &str) -> Result<Vec<HighlightSpan>> {
        let tree = match self.parser(lang)? {
            Some(mut parser) => parser.parse(source, None),
            None => None,
        };
        Ok(self.segment(lang, source, tree.as_ref(), 0..source.len()))
    }

    /// Split `window` of `source` into contiguous highlight spans.
    ///
    /// Nodes that start before the window are clipped to it, so the first
    /// span always starts at `window.start`.
    pub(crate) fn segment(
        &self,
        lang: LanguageId,
        source: &str,
        tree: Option<&Tree>,
        window: Range<usize>,
    ) -> Vec<HighlightSpan> {
        let window = window.start.min(source.len())..window.end.min(source.len());
        if window.is_empty() {
            return Vec::new();
        }

        let captures = match (self.grammars.get(&lang), tree) {
            (Some(grammar), Some(tree)) => collect_captures(grammar, source, tree, &window),
            _ => Vec::new(),
        };
        paint(source, window, &captures)
    }
}

/// Run the highlight query over `window` and keep one capture per node
fn collect_captures(
    grammar: &Grammar,
    source: &str,
    tree: &Tree,
    window: &Range<usize>,
) -> Vec<Capture> {
    let mut cursor = QueryCursor::new();
    cursor.set_byte_range(window.clone());

    let mut captures = Vec::new();
    let mut matches = cursor.captures(&grammar.query, tree.root_node(), source.as_bytes());
    while let Some((query_match, capture_idx)) = matches.next() {
        let capture = &query_match.captures[*capture_idx];
        let capture_name = &grammar.query.capture_names()[capture.index as usize];

        // Skip captures we have no color slot for (@embedded, @local.*)
        let Some(highlight) = highlight_id_for_name(capture_name) else {
            continue;
        };

        let node = capture.node;
        if node.start_byte() >= node.end_byte() {
            continue;
        }
        captures.push(Capture {
            range: node.start_byte()..node.end_byte(),
            pattern: query_match.pattern_index,
            highlight,
        });
    }

    // The same node can match several patterns; the earliest pattern wins
    captures.sort_by_key(|c| (c.range.start, Reverse(c.range.end), c.pattern));
    captures.dedup_by(|later, earlier| later.range == earlier.range);
    captures
}

/// Assign every byte of the window to its innermost capture and group runs
fn paint(source: &str, window: Range<usize>, captures: &[Capture]) -> Vec<HighlightSpan> {
    let mut order: Vec<&Capture> = captures.iter().collect();
    // Outer nodes first so nested captures paint over their parents
    order.sort_by_key(|c| Reverse(c.range.len()));

    let mut owners: Vec<Option<usize>> = vec![None; window.len()];
    for (idx, capture) in order.iter().enumerate() {
        let start = capture.range.start.max(window.start);
        let end = capture.range.end.min(window.end);
        if start >= end {
            continue;
        }
        for owner in &mut owners[start - window.start..end - window.start] {
            *owner = Some(idx);
        }
    }

    let bytes = source.as_bytes();
    let owner_at = |pos: usize| owners[pos - window.start];
    let mut spans = Vec::new();
    let mut span_start = window.start;

    for pos in window.start + 1..=window.end {
        let boundary = pos == window.end
            || (source.is_char_boundary(pos)
                && (owner_at(pos) != owner_at(pos - 1)
                    || bytes[pos] == b'\n'
                    || bytes[pos - 1] == b'\n'));
        if !boundary {
            continue;
        }

        let highlight = if bytes[span_start] == b'\n' {
            None
        } else {
            owner_at(span_start).map(|idx| order[idx].highlight)
        };
        spans.push(HighlightSpan {
            start: span_start,
            end: pos,
            highlight,
        });
        span_start = pos;
    }

    spans
}

/// Advance a tree-sitter Point (row, column in bytes) over `text`
pub(crate) fn advance_point(mut point: Point, text: &str) -> Point {
    for &byte in text.as_bytes() {
        if byte == b'\n' {
            point.row += 1;
            point.column = 0;
        } else {
            point.column += 1;
        }
    }
    point
}
