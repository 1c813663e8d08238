//! Tracing infrastructure for development diagnostics
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=streamlight::syntax=trace` - per-chunk reparse detail
//! - `RUST_LOG=streamlight::highlighter=debug` - remote/local dispatch
//!
//! # Log Files
//!
//! Logs are written to `~/.config/streamlight/logs/streamlight.log` with daily
//! rotation. File logging uses debug level by default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::syntax::TokenBuffer;

/// Initialize tracing subscriber with console and file logging
///
/// Console output goes to stderr so stdout stays clean for command output,
/// and respects RUST_LOG (default `warn`).
///
/// File logging writes to `~/.config/streamlight/logs/streamlight.log` with
/// daily rotation.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Console layer - respects RUST_LOG
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "streamlight.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Lightweight snapshot of a consumer's token view for diffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub token_count: usize,
    pub recall_count: usize,
    pub bytes: usize,
}

impl StreamSnapshot {
    pub fn from_buffer(buffer: &TokenBuffer) -> Self {
        Self {
            token_count: buffer.tokens().len(),
            recall_count: buffer.recall_count(),
            bytes: buffer.tokens().iter().map(|t| t.content.len()).sum(),
        }
    }

    /// Generate a diff description between two snapshots
    pub fn diff(&self, other: &StreamSnapshot) -> Option<String> {
        let mut changes = Vec::new();
        if self.recall_count != other.recall_count {
            changes.push(format!(
                "recalls: {} → {}",
                self.recall_count, other.recall_count
            ));
        }
        if self.token_count != other.token_count {
            changes.push(format!(
                "tokens: {} → {}",
                self.token_count, other.token_count
            ));
        }
        if self.bytes != other.bytes {
            changes.push(format!("bytes: {} → {}", self.bytes, other.bytes));
        }

        if changes.is_empty() {
            None
        } else {
            Some(changes.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ThemedToken, TokenBatch};

    fn token(content: &str, offset: usize) -> ThemedToken {
        ThemedToken {
            content: content.to_string(),
            offset,
            scope: None,
            color: None,
        }
    }

    #[test]
    fn test_snapshot_diff() {
        let mut buffer = TokenBuffer::new();
        let before = StreamSnapshot::from_buffer(&buffer);
        assert_eq!(before.diff(&before), None);

        buffer.apply(TokenBatch::Tokens(vec![token("ab", 0)]));
        buffer.apply(TokenBatch::Recall(1));
        buffer.apply(TokenBatch::Tokens(vec![token("abc", 0)]));
        let after = StreamSnapshot::from_buffer(&buffer);
        assert_eq!(
            before.diff(&after).as_deref(),
            Some("recalls: 0 → 1; tokens: 0 → 1; bytes: 0 → 3")
        );
    }
}
