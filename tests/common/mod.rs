//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::Arc;

use streamlight::syntax::{LanguageId, TokenBatch, TokenBuffer, TokenTransform, Tokenizer};

/// Transform for `lang` with the fallback theme
pub fn transform(lang: &str, allow_recalls: bool) -> TokenTransform {
    let tokenizer = Arc::new(Tokenizer::new(["github-dark"], [lang]).unwrap());
    let language = LanguageId::from_name(lang).unwrap();
    TokenTransform::new(tokenizer, language, "github-dark", allow_recalls).unwrap()
}

/// Push every chunk, flush, and return the consumer view plus every batch
pub fn stream_all(lang: &str, chunks: &[&str], allow_recalls: bool) -> (TokenBuffer, Vec<TokenBatch>) {
    let mut transform = transform(lang, allow_recalls);
    let mut batches = Vec::new();
    for chunk in chunks {
        batches.extend(transform.push(chunk));
    }
    batches.extend(transform.flush());

    let mut buffer = TokenBuffer::new();
    buffer.extend(batches.iter().cloned());
    (buffer, batches)
}

pub fn recall_count(batches: &[TokenBatch]) -> usize {
    batches
        .iter()
        .filter(|batch| matches!(batch, TokenBatch::Recall(_)))
        .count()
}

/// The Go snippet used by the streaming scenarios
pub const GO_CHUNKS: [&str; 3] = ["func foo(", "bar string) {", "return bar }"];

pub const RUST_SAMPLE: &str = r#"use std::collections::HashMap;

/// Count words
fn count(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}
"#;
