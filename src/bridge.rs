//! Editor Mutation Bridge
//!
//! The single surface through which the chat sidebar, the command box and
//! the suggestion workflow read or change the document. Callers hold a
//! cloned [`EditorBridge`] (or an `Arc<dyn EditorSurface>`), never the
//! [`Document`] itself. Every call takes the document lock for its whole
//! duration, so one mutation completes before the next is observable.

use crate::document::{parse_markup, plain_lines, AnchorId, Block, Document};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Where `mutate` places its content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationMode {
    /// At the cursor, or the end of the active selection when no cursor is set
    Insert,
    /// Substitute the active selection
    Replace,
    /// After the last block
    Append,
}

/// Record of an applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub mode: MutationMode,
    /// Char range of the inserted text after the edit
    pub range: Range<usize>,
}

/// Capability object for reading and mutating the document
pub trait EditorSurface: Send + Sync {
    /// Current plain-text content
    fn read(&self) -> EngineResult<String>;

    /// Caret offset, `None` when the editor has no focus
    fn cursor(&self) -> EngineResult<Option<usize>>;

    /// Insert, replace or append markup
    fn mutate(&self, content: &str, mode: MutationMode) -> EngineResult<Mutation>;

    /// Replace the whole document with plain text
    fn set_all(&self, content: &str) -> EngineResult<()>;

    /// Content revision, changed by every edit
    fn revision(&self) -> EngineResult<u64>;

    /// `set_all`, unless the document was edited since `revision`
    ///
    /// Fails with `MutationConflict` and leaves the document untouched when
    /// the revision has moved.
    fn set_all_at(&self, revision: u64, content: &str) -> EngineResult<()>;

    /// Register `range` as the active selection and return its anchor
    fn select(&self, range: Range<usize>) -> EngineResult<AnchorId>;

    /// Forget the active selection without releasing its anchor
    fn clear_selection(&self) -> EngineResult<()>;

    /// Plain text currently covered by an anchor
    fn anchor_text(&self, anchor: AnchorId) -> EngineResult<String>;

    /// Replace an anchored range with plain text and move the cursor after it
    fn replace_anchor(&self, anchor: AnchorId, text: &str) -> EngineResult<Mutation>;

    /// Drop an anchor that is no longer needed
    fn release_anchor(&self, anchor: AnchorId) -> EngineResult<()>;
}

#[derive(Debug, Default)]
struct BridgeState {
    document: Document,
    selection: Option<AnchorId>,
}

impl BridgeState {
    fn replace_all(&mut self, content: &str) {
        let blocks = plain_lines(content)
            .into_iter()
            .map(|line| Block::paragraph(line.text))
            .collect();
        self.document.replace_all(blocks);
        self.selection = None;
        info!("📄 Document replaced ({} chars)", content.chars().count());
    }
}

/// Shared handle to the document
#[derive(Debug, Clone, Default)]
pub struct EditorBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl EditorBridge {
    pub fn new(document: Document) -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState {
                document,
                selection: None,
            })),
        }
    }

    /// Snapshot of the styled blocks
    pub fn blocks(&self) -> EngineResult<Vec<Block>> {
        Ok(self.state.lock()?.document.blocks().to_vec())
    }

    pub fn set_cursor(&self, cursor: Option<usize>) -> EngineResult<()> {
        self.state.lock()?.document.set_cursor(cursor);
        Ok(())
    }

    /// Markdown rendering for saving back to disk
    pub fn markup(&self) -> EngineResult<String> {
        Ok(self.state.lock()?.document.to_markup())
    }

    pub fn has_selection(&self) -> EngineResult<bool> {
        Ok(self.state.lock()?.selection.is_some())
    }

    /// Undo the last mutation. Anchors and the selection do not survive.
    pub fn undo(&self) -> EngineResult<bool> {
        let mut state = self.state.lock()?;
        let restored = state.document.undo();
        if restored {
            state.selection = None;
            info!("↩️ Undo applied");
        }
        Ok(restored)
    }
}

impl EditorSurface for EditorBridge {
    fn read(&self) -> EngineResult<String> {
        Ok(self.state.lock()?.document.text())
    }

    fn cursor(&self) -> EngineResult<Option<usize>> {
        Ok(self.state.lock()?.document.cursor())
    }

    fn mutate(&self, content: &str, mode: MutationMode) -> EngineResult<Mutation> {
        let mut state = self.state.lock()?;
        let lines = parse_markup(content);

        let range = match mode {
            MutationMode::Insert => {
                let at = match (state.document.cursor(), state.selection) {
                    (Some(cursor), _) => cursor,
                    (None, Some(anchor)) => state.document.resolve(anchor)?.end,
                    (None, None) => state.document.char_len(),
                };
                state.document.splice(at..at, lines)?
            }
            MutationMode::Replace => {
                let anchor = state.selection.ok_or(EngineError::NoActiveSelection)?;
                let target = state.document.resolve(anchor)?;
                let inserted = state.document.splice(target, lines)?;
                state.document.release_anchor(anchor);
                state.selection = None;
                inserted
            }
            MutationMode::Append => {
                let end = state.document.char_len();
                let mut lines = lines;
                // Start a fresh block unless the document is a single empty line
                if end > 0 {
                    lines.insert(
                        0,
                        crate::document::Line {
                            style: None,
                            text: String::new(),
                        },
                    );
                }
                let inserted = state.document.splice(end..end, lines)?;
                let skip = if end > 0 { 1 } else { 0 };
                (inserted.start + skip).min(inserted.end)..inserted.end
            }
        };

        state.document.set_cursor(Some(range.end));
        debug!("📝 {:?} applied at {}..{}", mode, range.start, range.end);
        Ok(Mutation { mode, range })
    }

    fn set_all(&self, content: &str) -> EngineResult<()> {
        self.state.lock()?.replace_all(content);
        Ok(())
    }

    fn revision(&self) -> EngineResult<u64> {
        Ok(self.state.lock()?.document.revision())
    }

    fn set_all_at(&self, revision: u64, content: &str) -> EngineResult<()> {
        let mut state = self.state.lock()?;
        let current = state.document.revision();
        if current != revision {
            return Err(EngineError::MutationConflict(format!(
                "document revision moved from {} to {}",
                revision, current
            )));
        }
        state.replace_all(content);
        Ok(())
    }

    fn select(&self, range: Range<usize>) -> EngineResult<AnchorId> {
        let mut state = self.state.lock()?;
        let anchor = state.document.create_anchor(range)?;
        state.selection = Some(anchor);
        Ok(anchor)
    }

    fn clear_selection(&self) -> EngineResult<()> {
        self.state.lock()?.selection = None;
        Ok(())
    }

    fn anchor_text(&self, anchor: AnchorId) -> EngineResult<String> {
        let state = self.state.lock()?;
        let range = state.document.resolve(anchor)?;
        state.document.slice(range)
    }

    fn replace_anchor(&self, anchor: AnchorId, text: &str) -> EngineResult<Mutation> {
        let mut state = self.state.lock()?;
        let target = state.document.resolve(anchor)?;
        let range = state.document.splice_text(target, text)?;
        state.document.release_anchor(anchor);
        if state.selection == Some(anchor) {
            state.selection = None;
        }
        state.document.set_cursor(Some(range.end));
        Ok(Mutation {
            mode: MutationMode::Replace,
            range,
        })
    }

    fn release_anchor(&self, anchor: AnchorId) -> EngineResult<()> {
        let mut state = self.state.lock()?;
        if state.selection == Some(anchor) {
            state.selection = None;
        }
        state.document.release_anchor(anchor);
        Ok(())
    }
}
