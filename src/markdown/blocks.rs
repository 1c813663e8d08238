//! Fenced code block extraction using pulldown-cmark

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::highlighter::HighlightOptions;

/// A fenced code block and its fence metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the info string, empty when absent
    pub lang: String,
    /// Rest of the info string
    pub meta: Option<String>,
    /// Block body without the final newline
    pub code: String,
    /// 1-based line of the opening fence in the document
    pub line: usize,
    /// Lines selected with `{1,3-4}` in the meta string
    pub highlights: Vec<usize>,
}

impl CodeBlock {
    pub fn options(&self) -> HighlightOptions {
        HighlightOptions {
            highlights: self.highlights.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// All fenced code blocks of `markdown`, in document order.
///
/// Indented code blocks carry no language and are skipped.
pub fn code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_TASKLISTS;
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let (lang, meta) = split_info(&info);
                current = Some(CodeBlock {
                    lang,
                    meta,
                    code: String::new(),
                    line: markdown[..range.start].matches('\n').count() + 1,
                    highlights: Vec::new(),
                });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(mut block) = current.take() {
                    if block.code.ends_with('\n') {
                        block.code.pop();
                    }
                    let line_count = block.code.split('\n').count();
                    block.highlights = block
                        .meta
                        .as_deref()
                        .map(|meta| parse_highlights(meta, line_count))
                        .unwrap_or_default();
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    tracing::trace!("extracted {} fenced code blocks", blocks.len());
    blocks
}

/// Split a fence info string into language and meta
pub fn split_info(info: &str) -> (String, Option<String>) {
    let info = info.trim();
    match info.split_once(char::is_whitespace) {
        Some((lang, meta)) => {
            let meta = meta.trim();
            let meta = (!meta.is_empty()).then(|| meta.to_string());
            (lang.to_string(), meta)
        }
        None => (info.to_string(), None),
    }
}

/// Line numbers selected by the first `{...}` group of a meta string.
///
/// Accepts single lines and inclusive ranges (`{1,3-4}`), ignores malformed
/// entries, and returns the lines sorted and deduplicated. Lines past
/// `line_count` are dropped.
pub fn parse_highlights(meta: &str, line_count: usize) -> Vec<usize> {
    let Some(open) = meta.find('{') else {
        return Vec::new();
    };
    let Some(len) = meta[open + 1..].find('}') else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for part in meta[open + 1..open + 1 + len].split(',') {
        let part = part.trim();
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) =
                    (start.trim().parse::<usize>(), end.trim().parse::<usize>())
                {
                    lines.extend(start..=end.min(line_count));
                }
            }
            None => {
                if let Ok(line) = part.parse::<usize>() {
                    if line <= line_count {
                        lines.push(line);
                    }
                }
            }
        }
    }

    lines.retain(|&line| line > 0);
    lines.sort_unstable();
    lines.dedup();
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_blocks_in_order() {
        let md = "# Title\n\n```rust {2}\nfn a() {}\nfn b() {}\n```\n\ntext\n\n```\nplain\n```\n";
        let blocks = code_blocks(md);
        assert_eq!(blocks.len(), 2);

        assert_eq!(blocks[0].lang, "rust");
        assert_eq!(blocks[0].meta.as_deref(), Some("{2}"));
        assert_eq!(blocks[0].code, "fn a() {}\nfn b() {}");
        assert_eq!(blocks[0].line, 3);
        assert_eq!(blocks[0].highlights, vec![2]);

        assert_eq!(blocks[1].lang, "");
        assert_eq!(blocks[1].code, "plain");
    }

    #[test]
    fn test_indented_blocks_are_skipped() {
        let md = "para\n\n    indented code\n";
        assert!(code_blocks(md).is_empty());
    }

    #[test]
    fn test_split_info() {
        assert_eq!(split_info("go"), ("go".to_string(), None));
        assert_eq!(
            split_info("ts [file.ts] {1}"),
            ("ts".to_string(), Some("[file.ts] {1}".to_string()))
        );
        assert_eq!(split_info(""), (String::new(), None));
    }

    #[test]
    fn test_parse_highlights() {
        assert_eq!(parse_highlights("{1,3-4}", 10), vec![1, 3, 4]);
        assert_eq!(parse_highlights("[a.rs] { 4 , 2-3 }", 10), vec![2, 3, 4]);
        assert_eq!(parse_highlights("{x,0,2}", 10), vec![2]);
        assert!(parse_highlights("no braces", 10).is_empty());
        assert!(parse_highlights("{1", 10).is_empty());
    }

    #[test]
    fn test_highlights_clamped_to_block_lines() {
        assert_eq!(parse_highlights("{2-4000000000}", 3), vec![2, 3]);
        assert_eq!(parse_highlights("{5,9-12,1}", 3), vec![1]);
        assert!(parse_highlights("{1-30000000}", 0).is_empty());
    }

    #[test]
    fn test_huge_fence_range_stays_within_block() {
        let md = "```rust {1-4000000000}\nfn a() {}\nfn b() {}\n```\n";
        let blocks = code_blocks(md);
        assert_eq!(blocks[0].highlights, vec![1, 2]);
    }
}
