//! Suggestion Workflow
//!
//! Lifecycle of one AI-proposed rewrite of a selection:
//! `Idle -> Requesting -> Ready -> (Accepted | Rejected) -> Idle`.
//!
//! Only one suggestion is alive at a time. A new trigger supersedes the
//! previous one: every trigger bumps a generation counter, and a completion
//! that returns under an older generation is dropped without touching the
//! document. The document itself is only changed by [`SuggestionWorkflow::accept`].

use crate::bridge::{EditorSurface, Mutation};
use crate::document::AnchorId;
use crate::error::{EngineError, EngineResult};
use crate::intent::TransformKind;
use crate::providers::CompletionProvider;
use crate::selection::SelectionSnapshot;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Observable state of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Requesting,
    Ready,
}

/// Stage of a single suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Requesting,
    Ready,
    Accepted,
    Rejected,
}

/// A proposed replacement for a captured selection
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSuggestion {
    pub original: String,
    /// Empty until the provider answers
    pub suggested: String,
    pub kind: TransformKind,
    pub anchor: AnchorId,
    pub status: SuggestionStatus,
}

#[derive(Debug, Default)]
struct WorkflowState {
    generation: u64,
    pending: Option<PendingSuggestion>,
}

/// Owns the pending suggestion. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SuggestionWorkflow {
    editor: Arc<dyn EditorSurface>,
    completion: Arc<dyn CompletionProvider>,
    session_id: String,
    state: Arc<Mutex<WorkflowState>>,
}

impl SuggestionWorkflow {
    pub fn new(
        editor: Arc<dyn EditorSurface>,
        completion: Arc<dyn CompletionProvider>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            editor,
            completion,
            session_id: session_id.into(),
            state: Arc::new(Mutex::new(WorkflowState::default())),
        }
    }

    pub fn status(&self) -> EngineResult<WorkflowStatus> {
        let state = self.state.lock()?;
        Ok(match state.pending.as_ref().map(|p| p.status) {
            Some(SuggestionStatus::Requesting) => WorkflowStatus::Requesting,
            Some(SuggestionStatus::Ready) => WorkflowStatus::Ready,
            _ => WorkflowStatus::Idle,
        })
    }

    /// Copy of the live suggestion, if any
    pub fn pending(&self) -> EngineResult<Option<PendingSuggestion>> {
        Ok(self.state.lock()?.pending.clone())
    }

    /// Ask the completion provider to rewrite the snapshot's text
    ///
    /// Rejected with `NoActiveSelection` when there is no snapshot or it is
    /// blank. Returns the Ready suggestion, or `Superseded` if a newer
    /// trigger replaced this one while it was in flight.
    pub async fn request(
        &self,
        snapshot: Option<SelectionSnapshot>,
        kind: TransformKind,
    ) -> EngineResult<PendingSuggestion> {
        let snapshot = match snapshot {
            Some(s) if !s.text.trim().is_empty() => s,
            _ => {
                info!("⚠️ {} requested with nothing selected", kind);
                return Err(EngineError::NoActiveSelection);
            }
        };

        let generation = {
            let mut state = self.state.lock()?;
            state.generation += 1;
            if let Some(previous) = state.pending.take() {
                debug!("Superseding {:?} suggestion", previous.status);
                if previous.anchor != snapshot.anchor {
                    self.editor.release_anchor(previous.anchor)?;
                }
            }
            state.pending = Some(PendingSuggestion {
                original: snapshot.text.clone(),
                suggested: String::new(),
                kind,
                anchor: snapshot.anchor,
                status: SuggestionStatus::Requesting,
            });
            state.generation
        };

        info!(
            "✨ Requesting {} for selection #{} ({} chars)",
            kind,
            snapshot.id,
            snapshot.text.chars().count()
        );
        let result = self
            .completion
            .complete(&kind.prompt(&snapshot.text), &self.session_id)
            .await;

        let mut state = self.state.lock()?;
        if state.generation != generation {
            debug!("Discarding superseded {} result (generation {})", kind, generation);
            return Err(EngineError::Superseded);
        }

        let suggested = match result {
            Ok(completion) if !completion.text.trim().is_empty() => {
                completion.text.trim().to_string()
            }
            Ok(_) => {
                state.pending = None;
                self.editor.release_anchor(snapshot.anchor)?;
                warn!("❌ {} returned an empty suggestion", kind);
                return Err(EngineError::ProviderUnavailable(
                    "empty suggestion".to_string(),
                ));
            }
            Err(e) => {
                state.pending = None;
                self.editor.release_anchor(snapshot.anchor)?;
                warn!("❌ {} request failed: {}", kind, e);
                return Err(e.into());
            }
        };

        let pending = state
            .pending
            .as_mut()
            .ok_or_else(|| EngineError::MutationConflict("suggestion was discarded".to_string()))?;
        pending.suggested = suggested;
        pending.status = SuggestionStatus::Ready;
        info!("✅ {} suggestion ready", kind);
        Ok(pending.clone())
    }

    /// Apply the Ready suggestion over its original anchor
    pub fn accept(&self) -> EngineResult<Mutation> {
        let suggestion = self.take_ready()?;

        match self
            .editor
            .replace_anchor(suggestion.anchor, &suggestion.suggested)
        {
            Ok(mutation) => {
                info!(
                    "✅ Accepted {} suggestion at {}..{}",
                    suggestion.kind, mutation.range.start, mutation.range.end
                );
                Ok(mutation)
            }
            Err(e) => {
                warn!("❌ Could not apply {} suggestion: {}", suggestion.kind, e);
                if let Err(release) = self.editor.release_anchor(suggestion.anchor) {
                    debug!("Anchor release failed: {}", release);
                }
                Err(match e {
                    conflict @ EngineError::MutationConflict(_) => conflict,
                    other => EngineError::MutationConflict(other.to_string()),
                })
            }
        }
    }

    /// Discard the Ready suggestion without touching the document
    pub fn reject(&self) -> EngineResult<PendingSuggestion> {
        let mut suggestion = self.take_ready()?;
        self.editor.release_anchor(suggestion.anchor)?;
        suggestion.status = SuggestionStatus::Rejected;
        info!("🗑️ Rejected {} suggestion", suggestion.kind);
        Ok(suggestion)
    }

    /// Remove the Ready suggestion, leaving the workflow Idle
    fn take_ready(&self) -> EngineResult<PendingSuggestion> {
        let mut state = self.state.lock()?;
        match state.pending.as_ref().map(|p| p.status) {
            Some(SuggestionStatus::Ready) => {
                state.generation += 1;
                state
                    .pending
                    .take()
                    .ok_or_else(|| EngineError::MutationConflict("no suggestion is ready".into()))
            }
            _ => Err(EngineError::MutationConflict(
                "no suggestion is ready".to_string(),
            )),
        }
    }
}
