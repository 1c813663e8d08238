//! Syntax highlighting module
//!
//! Provides tree-sitter based tokenization with:
//! - Language lookup from names, aliases and file extensions
//! - A shared, read-only [`Tokenizer`] (grammars, queries, themes)
//! - An incremental [`TokenTransform`] for text that arrives in chunks
//!
//! ## Architecture
//!
//! ```text
//! chunk → TokenTransform::push → (append edit + incremental reparse)
//!       → changed ranges → re-segment affected tail → [Recall(n), Tokens(..)]
//! ```

mod highlights;
mod languages;
mod tokenizer;
mod transform;

pub use highlights::{
    highlight_id_for_name, highlight_name, HighlightId, HighlightSpan, HIGHLIGHT_NAMES,
};
pub use languages::{LanguageId, GRAMMAR_LANGUAGES};
pub use tokenizer::Tokenizer;
pub use transform::{ThemedToken, TokenBatch, TokenBuffer, TokenStream, TokenTransform};
