//! Selection Capture
//!
//! Turns selection-change events from the editor into immutable
//! [`SelectionSnapshot`]s. A new selection supersedes the previous snapshot;
//! an empty selection only clears the toolbar affordance.

use crate::bridge::EditorSurface;
use crate::document::AnchorId;
use crate::error::EngineResult;
use chrono::{DateTime, Utc};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Screen position used to place the floating toolbar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// The user's selection at one moment
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    /// Monotonic id, later snapshots have larger ids
    pub id: u64,
    /// Plain-text rendering of the selected range
    pub text: String,
    pub anchor: AnchorId,
    pub captured_at: DateTime<Utc>,
}

/// Result of a selection change
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// Non-empty selection: show the toolbar at `hint`
    Captured {
        snapshot: SelectionSnapshot,
        hint: Option<ScreenPoint>,
    },
    /// Nothing selected: hide the toolbar
    Cleared,
}

/// Watches selection changes and keeps the latest snapshot
pub struct SelectionCapture {
    editor: Arc<dyn EditorSurface>,
    current: Option<SelectionSnapshot>,
    next_id: u64,
}

impl SelectionCapture {
    pub fn new(editor: Arc<dyn EditorSurface>) -> Self {
        Self {
            editor,
            current: None,
            next_id: 1,
        }
    }

    /// Handle a selection-change event
    ///
    /// `range` is the selected char range, `None` or empty for a collapsed caret.
    pub fn on_selection_change(
        &mut self,
        range: Option<Range<usize>>,
        hint: Option<ScreenPoint>,
    ) -> EngineResult<SelectionEvent> {
        let range = match range {
            Some(r) if r.start < r.end => r,
            _ => {
                self.supersede()?;
                self.editor.clear_selection()?;
                debug!("Selection cleared");
                return Ok(SelectionEvent::Cleared);
            }
        };

        self.supersede()?;
        let anchor = self.editor.select(range)?;
        let text = self.editor.anchor_text(anchor)?;

        if text.trim().is_empty() {
            self.editor.release_anchor(anchor)?;
            debug!("Whitespace-only selection ignored");
            return Ok(SelectionEvent::Cleared);
        }

        let snapshot = SelectionSnapshot {
            id: self.next_id,
            text,
            anchor,
            captured_at: Utc::now(),
        };
        self.next_id += 1;

        info!(
            "📌 Selection #{} captured ({} chars)",
            snapshot.id,
            snapshot.text.chars().count()
        );
        self.current = Some(snapshot.clone());

        Ok(SelectionEvent::Captured { snapshot, hint })
    }

    /// The latest live snapshot, if any
    pub fn current(&self) -> Option<&SelectionSnapshot> {
        self.current.as_ref()
    }

    /// Hand the current snapshot to the workflow, which then owns its anchor
    pub fn take_for_workflow(&mut self) -> Option<SelectionSnapshot> {
        self.current.take()
    }

    /// Drop the current snapshot and release its anchor
    fn supersede(&mut self) -> EngineResult<()> {
        if let Some(previous) = self.current.take() {
            self.editor.release_anchor(previous.anchor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EditorBridge;
    use crate::document::Document;

    fn capture(text: &str) -> (EditorBridge, SelectionCapture) {
        let bridge = EditorBridge::new(Document::from_text(text));
        let capture = SelectionCapture::new(Arc::new(bridge.clone()));
        (bridge, capture)
    }

    #[test]
    fn test_capture_flow() {
        let (_bridge, mut capture) = capture("The cat sat on mat");
        let event = capture
            .on_selection_change(Some(4..7), Some(ScreenPoint { x: 10.0, y: 20.0 }))
            .unwrap();

        match event {
            SelectionEvent::Captured { snapshot, hint } => {
                assert_eq!(snapshot.text, "cat");
                assert_eq!(hint, Some(ScreenPoint { x: 10.0, y: 20.0 }));
            }
            _ => panic!("Expected Captured"),
        }
        assert!(capture.current().is_some());
    }

    #[test]
    fn test_empty_selection_clears() {
        let (bridge, mut capture) = capture("hello");
        capture.on_selection_change(Some(0..5), None).unwrap();
        let event = capture.on_selection_change(Some(2..2), None).unwrap();
        assert_eq!(event, SelectionEvent::Cleared);
        assert!(capture.current().is_none());
        assert!(!bridge.has_selection().unwrap());
    }

    #[test]
    fn test_whitespace_selection_ignored() {
        let (_bridge, mut capture) = capture("a    b");
        let event = capture.on_selection_change(Some(1..5), None).unwrap();
        assert_eq!(event, SelectionEvent::Cleared);
    }

    #[test]
    fn test_new_selection_supersedes_old() {
        let (bridge, mut capture) = capture("first second");
        capture.on_selection_change(Some(0..5), None).unwrap();
        let old = capture.current().cloned().unwrap();
        capture.on_selection_change(Some(6..12), None).unwrap();
        let new = capture.current().cloned().unwrap();

        assert!(new.id > old.id);
        assert_eq!(new.text, "second");
        // Superseded anchor was released
        assert!(bridge.anchor_text(old.anchor).is_err());
    }

    #[test]
    fn test_consumed_anchor_survives_new_selection() {
        let (bridge, mut capture) = capture("first second");
        capture.on_selection_change(Some(0..5), None).unwrap();
        let taken = capture.take_for_workflow().unwrap();
        assert!(capture.current().is_none());
        capture.on_selection_change(None, None).unwrap();
        assert_eq!(bridge.anchor_text(taken.anchor).unwrap(), "first");
    }

    #[test]
    fn test_multi_block_selection_is_plain_text() {
        let bridge = EditorBridge::new(Document::from_markup("# Title\n- item"));
        let mut capture = SelectionCapture::new(Arc::new(bridge));
        let event = capture.on_selection_change(Some(2..9), None).unwrap();
        match event {
            SelectionEvent::Captured { snapshot, .. } => assert_eq!(snapshot.text, "tle\nite"),
            _ => panic!("Expected Captured"),
        }
    }
}
