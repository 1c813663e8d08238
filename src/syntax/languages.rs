//! Language identification and detection
//!
//! Maps language names, aliases and file extensions to language IDs and
//! provides the grammar and highlight query for each of them.

use std::path::Path;

/// Supported language identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LanguageId {
    #[default]
    PlainText,
    Rust,
    Python,
    Go,
    C,
    Cpp,
    Java,
    Bash,
}

/// Every language with a grammar, in registration order
pub const GRAMMAR_LANGUAGES: &[LanguageId] = &[
    LanguageId::Rust,
    LanguageId::Python,
    LanguageId::Go,
    LanguageId::C,
    LanguageId::Cpp,
    LanguageId::Java,
    LanguageId::Bash,
];

impl LanguageId {
    /// Resolve a fence or request language name (case-insensitive).
    ///
    /// Returns `None` for names we have no grammar for, which callers
    /// surface as an initialization error.
    pub fn from_name(name: &str) -> Option<Self> {
        let lang = match name.trim().to_lowercase().as_str() {
            "" | "text" | "txt" | "plain" | "plaintext" => LanguageId::PlainText,
            "rust" | "rs" => LanguageId::Rust,
            "python" | "py" => LanguageId::Python,
            "go" | "golang" => LanguageId::Go,
            "c" | "h" => LanguageId::C,
            "cpp" | "c++" | "cc" | "cxx" | "hpp" => LanguageId::Cpp,
            "java" => LanguageId::Java,
            "bash" | "sh" | "shell" | "zsh" => LanguageId::Bash,
            _ => return None,
        };
        Some(lang)
    }

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => LanguageId::Rust,
            "py" | "pyi" => LanguageId::Python,
            "go" => LanguageId::Go,
            "c" | "h" => LanguageId::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => LanguageId::Cpp,
            "java" => LanguageId::Java,
            "sh" | "bash" | "zsh" => LanguageId::Bash,
            _ => LanguageId::PlainText,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(LanguageId::PlainText)
    }

    /// Canonical name, as accepted by [`LanguageId::from_name`]
    pub fn name(&self) -> &'static str {
        match self {
            LanguageId::PlainText => "text",
            LanguageId::Rust => "rust",
            LanguageId::Python => "python",
            LanguageId::Go => "go",
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
            LanguageId::Java => "java",
            LanguageId::Bash => "bash",
        }
    }

    /// Check if this language has syntax highlighting support
    pub fn has_highlighting(&self) -> bool {
        !matches!(self, LanguageId::PlainText)
    }

    /// Tree-sitter grammar and highlight query, `None` for plain text
    pub(crate) fn grammar(&self) -> Option<(tree_sitter::Language, &'static str)> {
        let grammar = match self {
            LanguageId::PlainText => return None,
            LanguageId::Rust => (
                tree_sitter_rust::LANGUAGE.into(),
                tree_sitter_rust::HIGHLIGHTS_QUERY,
            ),
            LanguageId::Python => (
                tree_sitter_python::LANGUAGE.into(),
                tree_sitter_python::HIGHLIGHTS_QUERY,
            ),
            LanguageId::Go => (
                tree_sitter_go::LANGUAGE.into(),
                tree_sitter_go::HIGHLIGHTS_QUERY,
            ),
            // Some grammars export HIGHLIGHT_QUERY (singular)
            LanguageId::C => (tree_sitter_c::LANGUAGE.into(), tree_sitter_c::HIGHLIGHT_QUERY),
            LanguageId::Cpp => (
                tree_sitter_cpp::LANGUAGE.into(),
                tree_sitter_cpp::HIGHLIGHT_QUERY,
            ),
            LanguageId::Java => (
                tree_sitter_java::LANGUAGE.into(),
                tree_sitter_java::HIGHLIGHTS_QUERY,
            ),
            LanguageId::Bash => (
                tree_sitter_bash::LANGUAGE.into(),
                tree_sitter_bash::HIGHLIGHT_QUERY,
            ),
        };
        Some(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(LanguageId::from_name("go"), Some(LanguageId::Go));
        assert_eq!(LanguageId::from_name("Golang"), Some(LanguageId::Go));
        assert_eq!(LanguageId::from_name("rs"), Some(LanguageId::Rust));
        assert_eq!(LanguageId::from_name("c++"), Some(LanguageId::Cpp));
        assert_eq!(LanguageId::from_name("text"), Some(LanguageId::PlainText));
        assert_eq!(LanguageId::from_name(""), Some(LanguageId::PlainText));
        assert_eq!(LanguageId::from_name("cobol"), None);
    }

    #[test]
    fn test_name_round_trips() {
        for lang in GRAMMAR_LANGUAGES {
            assert_eq!(LanguageId::from_name(lang.name()), Some(*lang));
        }
        assert_eq!(
            LanguageId::from_name(LanguageId::PlainText.name()),
            Some(LanguageId::PlainText)
        );
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(LanguageId::from_extension("rs"), LanguageId::Rust);
        assert_eq!(LanguageId::from_extension("GO"), LanguageId::Go);
        assert_eq!(LanguageId::from_extension("hpp"), LanguageId::Cpp);
        assert_eq!(LanguageId::from_extension("txt"), LanguageId::PlainText);
        assert_eq!(LanguageId::from_extension("unknown"), LanguageId::PlainText);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(LanguageId::from_path(Path::new("main.go")), LanguageId::Go);
        assert_eq!(
            LanguageId::from_path(Path::new("/path/to/build.sh")),
            LanguageId::Bash
        );
        assert_eq!(
            LanguageId::from_path(Path::new("no_extension")),
            LanguageId::PlainText
        );
    }

    #[test]
    fn test_plain_text_has_no_grammar() {
        assert!(LanguageId::PlainText.grammar().is_none());
        assert!(!LanguageId::PlainText.has_highlighting());
        for lang in GRAMMAR_LANGUAGES {
            assert!(lang.grammar().is_some(), "{:?} has no grammar", lang);
        }
    }
}
