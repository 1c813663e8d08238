//! Whole-block highlighting
//!
//! A [`Highlighter`] turns a complete code block into a [`HighlightResult`]
//! (a small HTML-like tree plus wrapper class and style). Two strategies:
//!
//! - [`LocalHighlighter`]: runs the tokenizer in-process
//! - [`DefaultHighlighter`]: asks the remote highlight service first and
//!   falls back to local highlighting once the service is known to be absent
//!
//! [`HighlightPlugin`] merges user options over these defaults for the
//! markdown pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::theme::FALLBACK_THEME;

mod dispatch;
mod local;
mod plugin;
mod remote;

pub use dispatch::{CircuitBreaker, DefaultHighlighter};
pub use local::LocalHighlighter;
pub use plugin::{HighlightPlugin, HighlightPluginOptions};
pub use remote::{
    encoded_len, HighlightRequest, HttpTransport, Transport, TransportMethod, HIGHLIGHT_PATH,
    POST_THRESHOLD,
};

/// Variant name of the primary theme in a multi-theme selection
pub const DEFAULT_VARIANT: &str = "default";

/// Highlight a complete code block. Never fails: implementations degrade to
/// [`HighlightResult::plain`].
#[async_trait]
pub trait Highlighter: Send + Sync {
    async fn resolve(
        &self,
        code: &str,
        lang: &str,
        theme: &ThemeSelection,
        options: &HighlightOptions,
    ) -> HighlightResult;
}

/// Theme request: a single theme id or a map of variant name → theme id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeSelection {
    Named(String),
    Multi(BTreeMap<String, String>),
}

impl Default for ThemeSelection {
    fn default() -> Self {
        ThemeSelection::Multi(BTreeMap::new())
    }
}

impl ThemeSelection {
    pub fn named(id: impl Into<String>) -> Self {
        ThemeSelection::Named(id.into())
    }

    /// `(variant, theme id)` pairs, primary first.
    ///
    /// The primary is the `default` variant when present, otherwise the
    /// first entry. An empty selection resolves to the fallback theme.
    pub fn variants(&self) -> Vec<(String, String)> {
        match self {
            ThemeSelection::Named(id) => vec![(DEFAULT_VARIANT.to_string(), id.clone())],
            ThemeSelection::Multi(map) if map.is_empty() => {
                vec![(DEFAULT_VARIANT.to_string(), FALLBACK_THEME.to_string())]
            }
            ThemeSelection::Multi(map) => {
                let mut variants: Vec<(String, String)> = map
                    .iter()
                    .map(|(variant, id)| (variant.clone(), id.clone()))
                    .collect();
                if let Some(idx) = variants.iter().position(|(v, _)| v == DEFAULT_VARIANT) {
                    let primary = variants.remove(idx);
                    variants.insert(0, primary);
                }
                variants
            }
        }
    }

    /// Theme ids in variant order, deduplicated
    pub fn theme_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for (_, id) in self.variants() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Per-block options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// 1-based line numbers to mark as highlighted
    pub highlights: Vec<usize>,
    /// Raw fence meta string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

/// Node of the rendered tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Text {
        value: String,
    },
    Element {
        #[serde(rename = "tagName")]
        tag_name: String,
        #[serde(default)]
        properties: BTreeMap<String, Value>,
        #[serde(default)]
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn element(
        tag_name: impl Into<String>,
        properties: BTreeMap<String, Value>,
        children: Vec<Node>,
    ) -> Self {
        Node::Element {
            tag_name: tag_name.into(),
            properties,
            children,
        }
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text { value } => out.push_str(&escape_html(value)),
            Node::Element {
                tag_name,
                properties,
                children,
            } => {
                out.push('<');
                out.push_str(tag_name);
                for (name, value) in properties {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    out.push_str(&format!(" {}=\"{}\"", name, escape_html(&value)));
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str(&format!("</{}>", tag_name));
            }
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { value } => out.push_str(value),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Rendered block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightResult {
    pub tree: Vec<Node>,
    #[serde(rename = "className")]
    pub class_name: String,
    pub style: String,
}

impl HighlightResult {
    /// Unstyled passthrough: one text node holding the code
    pub fn plain(code: &str) -> Self {
        Self {
            tree: vec![Node::text(code)],
            class_name: String::new(),
            style: String::new(),
        }
    }

    /// Whether this is the unstyled passthrough shape
    pub fn is_plain(&self) -> bool {
        self.class_name.is_empty()
            && self.style.is_empty()
            && matches!(self.tree.as_slice(), [Node::Text { .. }])
    }

    /// Concatenated text of the whole tree
    pub fn text_content(&self) -> String {
        self.tree.iter().map(Node::text_content).collect()
    }

    /// `<pre><code>` markup for the tree
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "<pre class=\"{}\" style=\"{}\"><code>",
            escape_html(&self.class_name),
            escape_html(&self.style)
        );
        for node in &self.tree {
            node.write_html(&mut out);
        }
        out.push_str("</code></pre>");
        out
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
