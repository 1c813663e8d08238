//! Streamlight - streaming syntax highlighting
//!
//! This crate tokenizes code that arrives in chunks (for example from a
//! language model), revising earlier tokens as more context arrives, and
//! highlights complete blocks locally or through a remote service.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod error;
pub mod highlighter;
pub mod markdown;
pub mod server;
pub mod session;
pub mod syntax;
pub mod theme;
pub mod tracing;

// Re-export commonly used types
pub use config::StreamlightConfig;
pub use error::{HighlightError, Result};
pub use highlighter::{
    DefaultHighlighter, HighlightOptions, HighlightResult, Highlighter, LocalHighlighter,
    ThemeSelection,
};
pub use session::{ChannelReader, ChunkReader, StreamOptions, StreamReader, StreamSession};
pub use syntax::{LanguageId, TokenBatch, TokenTransform, Tokenizer};
pub use theme::Theme;
