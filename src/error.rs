//! Error taxonomy shared by the session, tokenizer and dispatch layers

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HighlightError>;

#[derive(Debug, Error)]
pub enum HighlightError {
    /// Tokenizer could not be built for the requested languages/themes
    #[error("failed to initialize tokenizer: {0}")]
    Initialization(String),
    /// Remote endpoint is absent (HTTP 404)
    #[error("remote highlighter is unavailable")]
    TransportUnavailable,
    #[error("remote highlighter returned status {0}")]
    Status(u16),
    #[error("remote highlight request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid highlight payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("chunk source read failed: {0}")]
    Source(#[from] std::io::Error),
}

impl HighlightError {
    /// Whether this error should trip the remote circuit breaker
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HighlightError::TransportUnavailable)
    }
}
