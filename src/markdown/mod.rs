//! Markdown integration
//!
//! Extracts fenced code blocks from a Markdown document so each can be
//! resolved through a [`Highlighter`](crate::highlighter::Highlighter).

mod blocks;

pub use blocks::{code_blocks, parse_highlights, split_info, CodeBlock};
