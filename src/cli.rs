//! Command-line argument parsing
//!
//! Supports:
//! - Running the highlight service
//! - Highlighting a file or stdin as a whole block
//! - Streaming a file through the incremental transform
//! - Highlighting every fenced block of a Markdown document

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StreamlightConfig;
use crate::highlighter::ThemeSelection;
use crate::session::StreamOptions;
use crate::syntax::LanguageId;

/// Streaming syntax highlighter
#[derive(Parser, Debug)]
#[command(name = "streamlight", version, about = "Streaming syntax highlighter")]
pub struct CliArgs {
    /// Config file to use instead of ~/.config/streamlight/config.yaml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the highlight endpoint
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Highlight a file (or stdin) as one block
    Highlight {
        #[command(flatten)]
        input: InputArgs,

        /// Ask the remote service at this base URL first
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Print HTML instead of JSON
        #[arg(long)]
        html: bool,
    },
    /// Stream a file (or stdin) through the incremental tokenizer
    Stream {
        #[command(flatten)]
        input: InputArgs,

        /// Only emit complete lines; never revise emitted tokens
        #[arg(long)]
        no_recalls: bool,

        /// Bytes per chunk
        #[arg(long, value_name = "N", default_value_t = 16)]
        chunk_size: usize,
    },
    /// Highlight every fenced code block of a Markdown file
    Markdown {
        /// Markdown file, stdin when omitted
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Theme id
        #[arg(long)]
        theme: Option<String>,

        /// Ask the remote service at this base URL first
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Print HTML instead of JSON
        #[arg(long)]
        html: bool,
    },
    /// List available themes
    Themes,
}

/// Source file, language and theme shared by the highlight commands
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Input file, stdin when omitted
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Language name; detected from the file extension when omitted
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Theme id
    #[arg(short, long)]
    pub theme: Option<String>,
}

impl InputArgs {
    /// Explicit `--lang`, else the file extension, else the configured default
    pub fn language(&self, config: &StreamlightConfig) -> String {
        if let Some(lang) = &self.lang {
            return lang.clone();
        }
        match self.path.as_deref().map(LanguageId::from_path) {
            Some(lang) if lang != LanguageId::PlainText => lang.name().to_string(),
            _ => config.language.clone(),
        }
    }

    pub fn theme(&self, config: &StreamlightConfig) -> ThemeSelection {
        ThemeSelection::named(self.theme.clone().unwrap_or_else(|| config.theme.clone()))
    }

    pub fn stream_options(&self, config: &StreamlightConfig, no_recalls: bool) -> StreamOptions {
        StreamOptions {
            language: Some(self.language(config)),
            theme: Some(self.theme.clone().unwrap_or_else(|| config.theme.clone())),
            allow_recalls: config.allow_recalls && !no_recalls,
        }
    }
}

/// Split `text` into chunks of at most `size` bytes on char boundaries
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}
