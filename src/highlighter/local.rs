//! In-process highlighting on top of the shared tokenizer

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{HighlightOptions, HighlightResult, Highlighter, Node, ThemeSelection};
use crate::error::{HighlightError, Result};
use crate::syntax::{LanguageId, ThemedToken, TokenBuffer, TokenTransform, Tokenizer};
use crate::theme::Theme;

type TokenizerKey = (LanguageId, Vec<String>);

/// Highlights blocks with a tokenizer built per (language, themes) pair and
/// cached for the lifetime of the highlighter.
#[derive(Debug, Default)]
pub struct LocalHighlighter {
    tokenizers: Mutex<HashMap<TokenizerKey, Arc<Tokenizer>>>,
}

impl LocalHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokenizer(&self, lang: LanguageId, theme_ids: &[String]) -> Result<Arc<Tokenizer>> {
        let key = (lang, theme_ids.to_vec());
        if let Some(tokenizer) = self.tokenizers.lock().get(&key) {
            return Ok(Arc::clone(tokenizer));
        }

        // Built outside the lock; a racing build for the same key is harmless
        let tokenizer = Arc::new(Tokenizer::new(theme_ids, [lang.name()])?);
        self.tokenizers
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::clone(&tokenizer));
        Ok(tokenizer)
    }

    /// Highlight a complete block, surfacing initialization failures
    pub fn highlight(
        &self,
        code: &str,
        lang: &str,
        theme: &ThemeSelection,
        options: &HighlightOptions,
    ) -> Result<HighlightResult> {
        let language = LanguageId::from_name(lang).ok_or_else(|| {
            HighlightError::Initialization(format!("unsupported language: {}", lang))
        })?;
        let variants = theme.variants();
        let tokenizer = self.tokenizer(language, &theme.theme_ids())?;

        let mut themes = Vec::with_capacity(variants.len());
        for (variant, id) in &variants {
            themes.push((variant.as_str(), tokenizer.theme(id)?));
        }
        let primary_id = &variants[0].1;

        let mut transform = TokenTransform::new(Arc::clone(&tokenizer), language, primary_id, false)?;
        let mut buffer = TokenBuffer::new();
        buffer.extend(transform.push(code));
        buffer.extend(transform.flush());

        tracing::trace!(
            lang = language.name(),
            tokens = buffer.tokens().len(),
            "highlighted block locally"
        );
        Ok(render(buffer.tokens(), &themes, options))
    }
}

#[async_trait]
impl Highlighter for LocalHighlighter {
    async fn resolve(
        &self,
        code: &str,
        lang: &str,
        theme: &ThemeSelection,
        options: &HighlightOptions,
    ) -> HighlightResult {
        match self.highlight(code, lang, theme, options) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Local highlighting failed for {:?}: {}", lang, e);
                HighlightResult::plain(code)
            }
        }
    }
}

/// Build the line tree, wrapper class and style.
///
/// `themes` is non-empty with the primary variant first.
fn render(
    tokens: &[ThemedToken],
    themes: &[(&str, Arc<Theme>)],
    options: &HighlightOptions,
) -> HighlightResult {
    let mut lines: Vec<Vec<Node>> = vec![Vec::new()];
    for token in tokens {
        if token.content == "\n" {
            lines.push(Vec::new());
            continue;
        }
        if let Some(line) = lines.last_mut() {
            line.push(render_token(token, themes));
        }
    }

    let mut tree = Vec::with_capacity(lines.len() * 2);
    for (idx, children) in lines.into_iter().enumerate() {
        let number = idx + 1;
        if idx > 0 {
            tree.push(Node::text("\n"));
        }
        let class = if options.highlights.contains(&number) {
            "line highlight"
        } else {
            "line"
        };
        let mut properties = BTreeMap::new();
        properties.insert("class".to_string(), Value::from(class));
        properties.insert("line".to_string(), Value::from(number));
        tree.push(Node::element("span", properties, children));
    }

    let mut class_name = String::from("shiki");
    let mut ids: Vec<&str> = Vec::new();
    for (_, theme) in themes {
        if !ids.contains(&theme.id.as_str()) {
            ids.push(&theme.id);
            class_name.push(' ');
            class_name.push_str(&theme.id);
        }
    }

    HighlightResult {
        tree,
        class_name,
        style: wrapper_style(themes),
    }
}

fn render_token(token: &ThemedToken, themes: &[(&str, Arc<Theme>)]) -> Node {
    if token.scope.is_none() {
        return Node::text(token.content.as_str());
    }

    let style = themes
        .iter()
        .enumerate()
        .map(|(idx, (variant, theme))| {
            if idx == 0 {
                let color = token.color.unwrap_or(theme.foreground);
                format!("color:{}", color.to_hex())
            } else {
                let color = theme.color_for_scope(token.scope);
                format!("--mdc-{}:{}", variant, color.to_hex())
            }
        })
        .collect::<Vec<_>>()
        .join(";");

    let mut properties = BTreeMap::new();
    properties.insert("style".to_string(), Value::from(style));
    Node::element("span", properties, vec![Node::text(token.content.as_str())])
}

fn wrapper_style(themes: &[(&str, Arc<Theme>)]) -> String {
    themes
        .iter()
        .enumerate()
        .map(|(idx, (variant, theme))| {
            if idx == 0 {
                format!(
                    "background-color:{};color:{}",
                    theme.background.to_hex(),
                    theme.foreground.to_hex()
                )
            } else {
                format!(
                    "--mdc-{variant}-bg:{};--mdc-{variant}:{}",
                    theme.background.to_hex(),
                    theme.foreground.to_hex()
                )
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
