//! Markdown pipeline integration: user options merged over defaults

use std::sync::Arc;
use std::time::Duration;

use super::{DefaultHighlighter, HighlightResult, Highlighter, ThemeSelection};
use crate::config::StreamlightConfig;
use crate::error::Result;
use crate::markdown::{code_blocks, CodeBlock};

/// User-facing options; `None` fields take the defaults
#[derive(Clone, Default)]
pub struct HighlightPluginOptions {
    pub theme: Option<ThemeSelection>,
    pub highlighter: Option<Arc<dyn Highlighter>>,
}

pub struct HighlightPlugin {
    theme: ThemeSelection,
    highlighter: Arc<dyn Highlighter>,
}

impl std::fmt::Debug for HighlightPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightPlugin")
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl HighlightPlugin {
    /// Merge `options` over the defaults: an empty theme selection and a
    /// [`DefaultHighlighter`] talking to the configured endpoint
    pub fn new(options: HighlightPluginOptions, config: &StreamlightConfig) -> Result<Self> {
        let highlighter: Arc<dyn Highlighter> = match options.highlighter {
            Some(highlighter) => highlighter,
            None => Arc::new(DefaultHighlighter::new(
                &config.endpoint,
                Duration::from_secs(config.request_timeout_secs),
            )?),
        };

        Ok(Self {
            theme: options.theme.unwrap_or_default(),
            highlighter,
        })
    }

    pub fn theme(&self) -> &ThemeSelection {
        &self.theme
    }

    pub async fn highlight(&self, block: &CodeBlock) -> HighlightResult {
        self.highlighter
            .resolve(&block.code, &block.lang, &self.theme, &block.options())
            .await
    }

    /// Resolve every fenced block of `markdown`, in document order
    pub async fn highlight_markdown(&self, markdown: &str) -> Vec<(CodeBlock, HighlightResult)> {
        let mut results = Vec::new();
        for block in code_blocks(markdown) {
            let result = self.highlight(&block).await;
            results.push((block, result));
        }
        results
    }
}
