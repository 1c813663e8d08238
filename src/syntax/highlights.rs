//! Highlight capture names and token spans
//!
//! Query captures are mapped onto a fixed table of names so that themes and
//! consumers only ever see a known vocabulary.

use serde::Serialize;

/// Standard tree-sitter capture names mapped to theme colors.
/// Index into this array is the HighlightId.
pub const HIGHLIGHT_NAMES: &[&str] = &[
    "attribute",             // @attribute
    "boolean",               // @boolean (true, false)
    "comment",               // @comment
    "comment.documentation", // @comment.documentation (/// docs)
    "constant",              // @constant
    "constant.builtin",      // @constant.builtin (nil, None)
    "constructor",           // @constructor (new Foo)
    "escape",                // @escape (string escapes)
    "function",              // @function
    "function.builtin",      // @function.builtin (print, len)
    "function.macro",        // @function.macro (println!)
    "function.method",       // @function.method
    "keyword",               // @keyword
    "keyword.return",        // @keyword.return
    "keyword.function",      // @keyword.function (func, fn, def)
    "keyword.operator",      // @keyword.operator (and, or)
    "label",                 // @label
    "module",                // @module (package names)
    "number",                // @number
    "operator",              // @operator
    "property",              // @property
    "punctuation",           // @punctuation (general)
    "punctuation.bracket",   // @punctuation.bracket
    "punctuation.delimiter", // @punctuation.delimiter
    "punctuation.special",   // @punctuation.special
    "string",                // @string
    "string.special",        // @string.special (regex, heredoc)
    "tag",                   // @tag
    "type",                  // @type
    "type.builtin",          // @type.builtin (int, string, bool)
    "variable",              // @variable
    "variable.builtin",      // @variable.builtin (self, this)
    "variable.parameter",    // @variable.parameter
];

/// Index into HIGHLIGHT_NAMES
pub type HighlightId = u16;

/// A contiguous byte range of the source with at most one highlight.
///
/// Spans produced for one region are contiguous and never cross a line
/// break: every `\n` is a span of its own with no highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Index into HIGHLIGHT_NAMES, `None` for unhighlighted text
    pub highlight: Option<HighlightId>,
}

impl HighlightSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Capture name of this span, if highlighted
    pub fn scope(&self) -> Option<&'static str> {
        self.highlight.and_then(highlight_name)
    }
}

/// Look up highlight ID by capture name
pub fn highlight_id_for_name(name: &str) -> Option<HighlightId> {
    // Handle hierarchical names: try exact match first, then progressively shorter
    // parents (e.g. "keyword.control.import" -> "keyword.control" -> "keyword").
    let mut current = name;
    loop {
        if let Some(pos) = HIGHLIGHT_NAMES.iter().position(|&n| n == current) {
            return Some(pos as HighlightId);
        }

        let Some(dot_pos) = current.rfind('.') else {
            break;
        };
        current = &current[..dot_pos];
    }

    None
}

/// Capture name for a highlight ID
pub fn highlight_name(id: HighlightId) -> Option<&'static str> {
    HIGHLIGHT_NAMES.get(id as usize).copied()
}
