//! Document Model
//!
//! An ordered sequence of styled blocks plus the anchor table that makes
//! ranges addressable across edits. Offsets are char offsets into the
//! plain-text rendering, where blocks are joined by `\n`.

use crate::error::{EngineError, EngineResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.*)$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.*)$").unwrap();
    static ref QUOTE: Regex = Regex::new(r"^>\s?(.*)$").unwrap();
    static ref TABLE_SEPARATOR: Regex = Regex::new(r"^\|?[\s:|-]*-{3,}[\s:|-]*\|?$").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*\s][^*]*?)\*").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`]+)`").unwrap();
    static ref HTML_HEADING: Regex = Regex::new(r"(?i)<h([1-6])[^>]*>").unwrap();
    static ref HTML_LIST_ITEM: Regex = Regex::new(r"(?i)<li[^>]*>").unwrap();
    static ref HTML_QUOTE: Regex = Regex::new(r"(?i)<blockquote[^>]*>").unwrap();
    static ref HTML_BREAK: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|blockquote|tr)>").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Maximum number of undo snapshots kept
const HISTORY_LIMIT: usize = 100;

/// Visual style of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStyle {
    Paragraph,
    Heading(u8),
    ListItem,
    Quote,
    Code,
    TableRow,
}

/// A single styled line of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub style: BlockStyle,
    pub text: String,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            style: BlockStyle::Paragraph,
            text: text.into(),
        }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A line of inserted content. `None` style adopts the surrounding block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub style: Option<BlockStyle>,
    pub text: String,
}

impl Line {
    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Opaque handle to a range of the document
///
/// Only the document can resolve it. Edits elsewhere shift it, edits that
/// overlap it invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(u64);

/// The document and its anchor table
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Block>,
    /// `None` marks an anchor invalidated by an overlapping edit
    anchors: HashMap<AnchorId, Option<Range<usize>>>,
    next_anchor: u64,
    cursor: Option<usize>,
    history: Vec<Vec<Block>>,
    /// Bumped by every content change
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::paragraph("")],
            anchors: HashMap::new(),
            next_anchor: 0,
            cursor: None,
            history: Vec::new(),
            revision: 0,
        }
    }

    /// Build a document from plain text, one paragraph per line
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.blocks = text.split('\n').map(Block::paragraph).collect();
        doc
    }

    /// Build a document from markup
    pub fn from_markup(markup: &str) -> Self {
        let mut doc = Self::new();
        doc.blocks = lines_to_blocks(parse_markup(markup));
        if doc.blocks.is_empty() {
            doc.blocks.push(Block::paragraph(""));
        }
        doc
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Plain-text rendering
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markdown rendering of the blocks, the inverse of [`parse_markup`]
    ///
    /// Inline emphasis does not survive parsing, so it is not restored.
    pub fn to_markup(&self) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.blocks.len());
        let mut previous = None;

        for block in &self.blocks {
            if previous == Some(BlockStyle::Code) && block.style != BlockStyle::Code {
                out.push("```".to_string());
            }
            match block.style {
                BlockStyle::Paragraph => out.push(block.text.clone()),
                BlockStyle::Heading(level) => {
                    out.push(format!("{} {}", "#".repeat(level.clamp(1, 6) as usize), block.text))
                }
                BlockStyle::ListItem => out.push(format!("- {}", block.text)),
                BlockStyle::Quote => out.push(format!("> {}", block.text)),
                BlockStyle::Code => {
                    if previous != Some(BlockStyle::Code) {
                        out.push("```".to_string());
                    }
                    out.push(block.text.clone());
                }
                BlockStyle::TableRow => {
                    out.push(format!("| {} |", block.text));
                    if previous != Some(BlockStyle::TableRow) {
                        let columns = block.text.split(" | ").count();
                        out.push(format!("|{}", " --- |".repeat(columns)));
                    }
                }
            }
            previous = Some(block.style);
        }
        if previous == Some(BlockStyle::Code) {
            out.push("```".to_string());
        }

        out.join("\n")
    }

    /// Content revision, changed by every splice, replacement and undo
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Length of the plain-text rendering in chars
    pub fn char_len(&self) -> usize {
        let chars: usize = self.blocks.iter().map(Block::char_len).sum();
        chars + self.blocks.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.char_len() == 0
    }

    /// Plain text of a range
    pub fn slice(&self, range: Range<usize>) -> EngineResult<String> {
        self.check_range(&range)?;
        Ok(self
            .text()
            .chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = cursor.map(|c| c.min(self.char_len()));
    }

    // ===== Anchors =====

    /// Register an anchor over `range`
    pub fn create_anchor(&mut self, range: Range<usize>) -> EngineResult<AnchorId> {
        self.check_range(&range)?;
        let id = AnchorId(self.next_anchor);
        self.next_anchor += 1;
        self.anchors.insert(id, Some(range));
        Ok(id)
    }

    /// Current range of an anchor
    pub fn resolve(&self, anchor: AnchorId) -> EngineResult<Range<usize>> {
        match self.anchors.get(&anchor) {
            Some(Some(range)) => Ok(range.clone()),
            Some(None) => Err(EngineError::MutationConflict(
                "the anchored text was changed by another edit".to_string(),
            )),
            None => Err(EngineError::MutationConflict(
                "the anchor is no longer registered".to_string(),
            )),
        }
    }

    pub fn release_anchor(&mut self, anchor: AnchorId) {
        self.anchors.remove(&anchor);
    }

    pub fn live_anchor_count(&self) -> usize {
        self.anchors.values().filter(|r| r.is_some()).count()
    }

    // ===== Mutation =====

    /// Replace `range` with `lines`, returning the range of the inserted text
    pub fn splice(&mut self, range: Range<usize>, lines: Vec<Line>) -> EngineResult<Range<usize>> {
        self.check_range(&range)?;
        let lines = if lines.is_empty() {
            vec![Line {
                style: None,
                text: String::new(),
            }]
        } else {
            lines
        };

        self.push_history();
        self.revision += 1;

        let (start_block, start_col) = self.locate(range.start);
        let (end_block, end_col) = self.locate(range.end);

        let prefix_style = self.blocks[start_block].style;
        let suffix_style = self.blocks[end_block].style;
        let prefix = take_chars(&self.blocks[start_block].text, start_col);
        let suffix = skip_chars(&self.blocks[end_block].text, end_col);

        let inserted: usize =
            lines.iter().map(Line::char_len).sum::<usize>() + lines.len() - 1;

        let last_index = lines.len() - 1;
        let mut replacement = Vec::with_capacity(lines.len());
        for (i, line) in lines.into_iter().enumerate() {
            let is_first = i == 0;
            let is_last = i == last_index;

            let style = match line.style {
                Some(style) if !(is_first && !prefix.is_empty()) => style,
                _ if is_first => prefix_style,
                _ if is_last && !suffix.is_empty() => suffix_style,
                _ => prefix_style,
            };

            let mut text = String::new();
            if is_first {
                text.push_str(&prefix);
            }
            text.push_str(&line.text);
            if is_last {
                text.push_str(&suffix);
            }
            replacement.push(Block { style, text });
        }

        self.blocks.splice(start_block..=end_block, replacement);

        let removed = range.end - range.start;
        self.adjust(range.start, range.end, inserted as isize - removed as isize);

        let inserted_range = range.start..range.start + inserted;
        debug!(
            "✏️ Spliced {}..{} -> {}..{}",
            range.start, range.end, inserted_range.start, inserted_range.end
        );
        Ok(inserted_range)
    }

    /// Replace `range` with plain text that adopts the surrounding style
    pub fn splice_text(&mut self, range: Range<usize>, text: &str) -> EngineResult<Range<usize>> {
        self.splice(range, plain_lines(text))
    }

    /// Replace the whole content, invalidating every anchor
    pub fn replace_all(&mut self, blocks: Vec<Block>) {
        self.push_history();
        self.revision += 1;
        self.blocks = if blocks.is_empty() {
            vec![Block::paragraph("")]
        } else {
            blocks
        };
        self.invalidate_all();
        self.cursor = None;
    }

    /// Restore the previous content. Returns false when there is no history.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(blocks) => {
                self.blocks = blocks;
                self.revision += 1;
                self.invalidate_all();
                self.cursor = None;
                true
            }
            None => false,
        }
    }

    fn push_history(&mut self) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(self.blocks.clone());
    }

    fn invalidate_all(&mut self) {
        for range in self.anchors.values_mut() {
            *range = None;
        }
    }

    /// Shift or invalidate anchors and the cursor after `start..end` changed by `delta`
    fn adjust(&mut self, start: usize, end: usize, delta: isize) {
        let shift = |pos: usize| (pos as isize + delta).max(0) as usize;

        for slot in self.anchors.values_mut() {
            let Some(range) = slot.clone() else {
                continue;
            };
            if range.end <= start {
                continue;
            }
            *slot = if range.start >= end {
                Some(shift(range.start)..shift(range.end))
            } else {
                None
            };
        }

        if let Some(cursor) = self.cursor {
            self.cursor = Some(if cursor <= start {
                cursor
            } else if cursor >= end {
                shift(cursor)
            } else {
                shift(end)
            });
        }
    }

    fn check_range(&self, range: &Range<usize>) -> EngineResult<()> {
        let len = self.char_len();
        if range.start > range.end || range.end > len {
            return Err(EngineError::MutationConflict(format!(
                "range {}..{} is outside the document (length {})",
                range.start, range.end, len
            )));
        }
        Ok(())
    }

    /// Map a char offset to (block index, column)
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut pos = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            let len = block.char_len();
            if offset <= pos + len {
                return (i, offset - pos);
            }
            pos += len + 1;
        }
        let last = self.blocks.len() - 1;
        (last, self.blocks[last].char_len())
    }
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn skip_chars(text: &str, n: usize) -> String {
    text.chars().skip(n).collect()
}

/// Split plain text into lines that adopt the surrounding style
pub fn plain_lines(text: &str) -> Vec<Line> {
    text.split('\n')
        .map(|t| Line {
            style: None,
            text: t.to_string(),
        })
        .collect()
}

fn lines_to_blocks(lines: Vec<Line>) -> Vec<Block> {
    lines
        .into_iter()
        .map(|l| Block {
            style: l.style.unwrap_or(BlockStyle::Paragraph),
            text: l.text,
        })
        .collect()
}

/// Strip inline emphasis markers
fn strip_inline(text: &str) -> String {
    let text = BOLD.replace_all(text, |caps: &regex::Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    });
    let text = ITALIC.replace_all(&text, "$1");
    INLINE_CODE.replace_all(&text, "$1").to_string()
}

/// Decode the handful of entities that show up in model output
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Rewrite simple HTML into the line-oriented markdown subset
fn html_to_markdown(markup: &str) -> String {
    let text = HTML_HEADING.replace_all(markup, |caps: &regex::Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n{} ", "#".repeat(level))
    });
    let text = HTML_LIST_ITEM.replace_all(&text, "\n- ");
    let text = HTML_QUOTE.replace_all(&text, "\n> ");
    let text = HTML_BREAK.replace_all(&text, "\n");
    let text = HTML_TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Parse the markup accepted by `mutate` into styled lines
///
/// Paragraph lines carry no style so that they adopt the block they land in.
pub fn parse_markup(markup: &str) -> Vec<Line> {
    let source = if HTML_TAG.is_match(markup) {
        html_to_markdown(markup)
    } else {
        markup.to_string()
    };
    let source = source.trim_matches('\n');

    let mut lines = Vec::new();
    let mut in_code = false;

    for raw in source.lines() {
        let trimmed = raw.trim_end();

        if trimmed.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }

        if in_code {
            lines.push(Line {
                style: Some(BlockStyle::Code),
                text: trimmed.to_string(),
            });
            continue;
        }

        let line = if let Some(caps) = HEADING.captures(trimmed) {
            Line {
                style: Some(BlockStyle::Heading(caps[1].len() as u8)),
                text: strip_inline(&caps[2]),
            }
        } else if trimmed.starts_with('|') {
            if TABLE_SEPARATOR.is_match(trimmed) {
                continue;
            }
            let cells: Vec<String> = trimmed
                .trim_matches('|')
                .split('|')
                .map(|c| strip_inline(c.trim()))
                .collect();
            Line {
                style: Some(BlockStyle::TableRow),
                text: cells.join(" | "),
            }
        } else if let Some(caps) = LIST_ITEM.captures(trimmed) {
            Line {
                style: Some(BlockStyle::ListItem),
                text: strip_inline(&caps[1]),
            }
        } else if let Some(caps) = QUOTE.captures(trimmed) {
            Line {
                style: Some(BlockStyle::Quote),
                text: strip_inline(&caps[1]),
            }
        } else {
            Line {
                style: None,
                text: strip_inline(raw.trim_end_matches('\r')),
            }
        };
        lines.push(line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_len() {
        let doc = Document::from_text("one\ntwo");
        assert_eq!(doc.text(), "one\ntwo");
        assert_eq!(doc.char_len(), 7);
        assert_eq!(doc.slice(4..7).unwrap(), "two");
    }

    #[test]
    fn test_splice_within_block() {
        let mut doc = Document::from_text("The cat sat on mat");
        let inserted = doc.splice_text(0..18, "The cat sat on the mat.").unwrap();
        assert_eq!(inserted, 0..23);
        assert_eq!(doc.text(), "The cat sat on the mat.");
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn test_splice_across_blocks_adopts_style() {
        let mut doc = Document::from_markup("# Title\nbody text");
        // "Title\nbody text": replace "tle\nbo" with "X"
        doc.splice_text(2..8, "X").unwrap();
        assert_eq!(doc.text(), "TiXdy text");
        assert_eq!(doc.blocks()[0].style, BlockStyle::Heading(1));
    }

    #[test]
    fn test_splice_multiline_creates_blocks() {
        let mut doc = Document::from_text("ab");
        doc.splice_text(1..1, "1\n2\n3").unwrap();
        assert_eq!(doc.text(), "a1\n2\n3b");
        assert_eq!(doc.blocks().len(), 3);
    }

    #[test]
    fn test_anchor_shifts_after_earlier_edit() {
        let mut doc = Document::from_text("hello world");
        let anchor = doc.create_anchor(6..11).unwrap();
        doc.splice_text(0..0, ">> ").unwrap();
        assert_eq!(doc.resolve(anchor).unwrap(), 9..14);
        assert_eq!(doc.slice(9..14).unwrap(), "world");
    }

    #[test]
    fn test_anchor_untouched_by_later_edit() {
        let mut doc = Document::from_text("hello world");
        let anchor = doc.create_anchor(0..5).unwrap();
        doc.splice_text(11..11, "!").unwrap();
        assert_eq!(doc.resolve(anchor).unwrap(), 0..5);
    }

    #[test]
    fn test_anchor_invalidated_by_overlap() {
        let mut doc = Document::from_text("hello world");
        let anchor = doc.create_anchor(0..5).unwrap();
        doc.splice_text(3..8, "").unwrap();
        assert!(matches!(
            doc.resolve(anchor),
            Err(EngineError::MutationConflict(_))
        ));
    }

    #[test]
    fn test_replace_all_invalidates_anchors() {
        let mut doc = Document::from_text("hello");
        let anchor = doc.create_anchor(0..5).unwrap();
        doc.replace_all(vec![Block::paragraph("bye")]);
        assert!(doc.resolve(anchor).is_err());
        assert_eq!(doc.live_anchor_count(), 0);
    }

    #[test]
    fn test_undo_restores_text() {
        let mut doc = Document::from_text("hello");
        doc.splice_text(5..5, " there").unwrap();
        assert!(doc.undo());
        assert_eq!(doc.text(), "hello");
        assert!(!doc.undo());
    }

    #[test]
    fn test_revision_tracks_content_changes() {
        let mut doc = Document::from_text("hello");
        let start = doc.revision();
        doc.set_cursor(Some(2));
        doc.create_anchor(0..2).unwrap();
        assert_eq!(doc.revision(), start);

        doc.splice_text(5..5, "!").unwrap();
        assert!(doc.revision() > start);
        let spliced = doc.revision();
        doc.undo();
        assert!(doc.revision() > spliced);
    }

    #[test]
    fn test_markup_round_trip() {
        let markup = "# Title\nIntro text\n\n- one\n- two\n> quoted\n```\nlet x = 1;\n```\n| a | b |\n| --- | --- |\n| 1 | 2 |";
        let doc = Document::from_markup(markup);
        assert_eq!(doc.to_markup(), markup);
        assert_eq!(Document::from_markup(&doc.to_markup()).blocks(), doc.blocks());
    }

    #[test]
    fn test_markup_closes_trailing_code_block() {
        let doc = Document::from_markup("## Example\n```\nfn main() {}");
        assert_eq!(doc.to_markup(), "## Example\n```\nfn main() {}\n```");
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut doc = Document::from_text("abc");
        assert!(doc.create_anchor(2..10).is_err());
        assert!(doc.splice_text(4..4, "x").is_err());
    }

    #[test]
    fn test_parse_markdown_blocks() {
        let lines = parse_markup("## Results\n- **Rust** (https://rust-lang.org): fast\n> quoted\nplain `code`");
        assert_eq!(lines[0].style, Some(BlockStyle::Heading(2)));
        assert_eq!(lines[0].text, "Results");
        assert_eq!(lines[1].style, Some(BlockStyle::ListItem));
        assert_eq!(lines[1].text, "Rust (https://rust-lang.org): fast");
        assert_eq!(lines[2].style, Some(BlockStyle::Quote));
        assert_eq!(lines[3].style, None);
        assert_eq!(lines[3].text, "plain code");
    }

    #[test]
    fn test_parse_table_drops_separator() {
        let lines = parse_markup("| Name | Age |\n|------|-----|\n| Ann | 31 |");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].style, Some(BlockStyle::TableRow));
        assert_eq!(lines[1].text, "Ann | 31");
    }

    #[test]
    fn test_parse_html() {
        let lines = parse_markup("<h1>Intro</h1><p>Tom &amp; Jerry</p><ul><li>one</li></ul>");
        assert_eq!(lines[0].style, Some(BlockStyle::Heading(1)));
        assert_eq!(lines[0].text, "Intro");
        assert!(lines.iter().any(|l| l.text == "Tom & Jerry"));
        assert!(lines
            .iter()
            .any(|l| l.style == Some(BlockStyle::ListItem) && l.text == "one"));
    }

    #[test]
    fn test_parse_code_fence() {
        let lines = parse_markup("```\nfn main() {}\n```");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].style, Some(BlockStyle::Code));
    }
}
