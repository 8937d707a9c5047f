//! Assistant
//!
//! The chat surface: classifies a command, dispatches it, and applies the
//! direct mutations a command asks for (inserting search results or
//! generated content, rewriting the whole document). Selection rewrites go
//! through the [`SuggestionWorkflow`] and wait for accept/reject.

use crate::audit::AuditLog;
use crate::bridge::{EditorSurface, Mutation, MutationMode};
use crate::config::Config;
use crate::dispatcher::{render_results, AgentResponse, Dispatcher, ErrorKind};
use crate::error::{EngineError, EngineResult};
use crate::intent::{Classifier, Intent, TransformKind, TransformScope};
use crate::providers::Providers;
use crate::selection::{ScreenPoint, SelectionCapture, SelectionEvent, SelectionSnapshot};
use crate::workflow::{PendingSuggestion, SuggestionWorkflow};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Result of handling one command
#[derive(Debug, Clone)]
pub struct Outcome {
    pub intent: Intent,
    pub response: AgentResponse,
    /// Mutation applied to the document, if the command made one
    pub applied: Option<Mutation>,
}

pub struct Assistant {
    classifier: Classifier,
    dispatcher: Dispatcher,
    editor: Arc<dyn EditorSurface>,
    selection: Mutex<SelectionCapture>,
    workflow: SuggestionWorkflow,
    audit: Option<AuditLog>,
    action_cutoff: f64,
}

impl Assistant {
    pub fn new(config: &Config, editor: Arc<dyn EditorSurface>, providers: Providers) -> Self {
        let workflow = SuggestionWorkflow::new(
            editor.clone(),
            providers.completion.clone(),
            config.session_id.clone(),
        );
        let dispatcher = Dispatcher::new(
            providers,
            editor.clone(),
            config.session_id.clone(),
            config.search_results,
        );

        Self {
            classifier: Classifier::new(config.command_corrections.clone()),
            dispatcher,
            selection: Mutex::new(SelectionCapture::new(editor.clone())),
            editor,
            workflow,
            audit: None,
            action_cutoff: config.action_match_cutoff,
        }
    }

    /// Record applied mutations in `audit`
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn workflow(&self) -> &SuggestionWorkflow {
        &self.workflow
    }

    pub fn on_selection_change(
        &self,
        range: Option<Range<usize>>,
        hint: Option<ScreenPoint>,
    ) -> EngineResult<SelectionEvent> {
        self.selection.lock()?.on_selection_change(range, hint)
    }

    pub fn current_selection(&self) -> EngineResult<Option<SelectionSnapshot>> {
        Ok(self.selection.lock()?.current().cloned())
    }

    /// Handle a command typed into the chat or command box
    pub async fn handle(&self, command: &str) -> EngineResult<Outcome> {
        let intent = self.classifier.classify(command);
        info!("💬 Command classified as {}", intent.name());

        if let Intent::EditorTransform {
            kind,
            scope: TransformScope::Selection,
        } = intent
        {
            return self.suggest(intent, kind).await;
        }

        // Whole-document rewrites only land on the content they were computed from
        let revision = self.editor.revision()?;
        let mut response = self.dispatcher.dispatch(&intent).await;
        let applied = match self.apply(&intent, &response, revision) {
            Ok(applied) => applied,
            Err(e @ EngineError::MutationConflict(_)) => {
                warn!("❌ {} result not applied: {}", intent.name(), e);
                response = error_response(&e);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(mutation) = &applied {
            self.record(intent.name(), mutation);
        }
        Ok(Outcome {
            intent,
            response,
            applied,
        })
    }

    /// Run a floating-toolbar action such as "Fix Grammar" on the selection
    pub async fn run_action(&self, label: &str) -> EngineResult<Outcome> {
        let kind = TransformKind::from_label(label, self.action_cutoff).ok_or_else(|| {
            EngineError::ClassificationAmbiguous(format!("Unknown action: {}", label))
        })?;
        let intent = Intent::EditorTransform {
            kind,
            scope: TransformScope::Selection,
        };
        self.suggest(intent, kind).await
    }

    /// Apply the Ready suggestion
    pub fn accept(&self) -> EngineResult<Mutation> {
        let kind = self.workflow.pending()?.map(|p| p.kind);
        let mutation = self.workflow.accept()?;
        if let Some(kind) = kind {
            self.record(kind.as_str(), &mutation);
        }
        Ok(mutation)
    }

    pub fn reject(&self) -> EngineResult<PendingSuggestion> {
        self.workflow.reject()
    }

    async fn suggest(&self, intent: Intent, kind: TransformKind) -> EngineResult<Outcome> {
        let snapshot = self.selection.lock()?.take_for_workflow();
        let response = match self.workflow.request(snapshot, kind).await {
            Ok(pending) => AgentResponse::Transform {
                kind,
                scope: TransformScope::Selection,
                text: pending.suggested,
            },
            Err(EngineError::Superseded) => {
                debug!("{} suggestion superseded, dropping its result", kind);
                AgentResponse::Superseded
            }
            Err(e) => {
                warn!("❌ {} suggestion failed: {}", kind, e);
                error_response(&e)
            }
        };
        Ok(Outcome {
            intent,
            response,
            applied: None,
        })
    }

    /// Apply the direct mutation a dispatched command asks for, if any
    fn apply(
        &self,
        intent: &Intent,
        response: &AgentResponse,
        revision: u64,
    ) -> EngineResult<Option<Mutation>> {
        let mutation = match (intent, response) {
            (
                Intent::WebSearch {
                    auto_insert: true, ..
                },
                AgentResponse::Search { query, results, .. },
            ) if !results.is_empty() => {
                let mode = if self.editor.cursor()?.is_some() {
                    MutationMode::Insert
                } else {
                    MutationMode::Append
                };
                self.editor.mutate(&render_results(query, results), mode)?
            }
            (Intent::CreateAndInsert { .. }, AgentResponse::Completion { text }) => {
                self.editor.mutate(text, MutationMode::Insert)?
            }
            (
                Intent::EditorTransform { .. },
                AgentResponse::Transform {
                    scope: TransformScope::Document,
                    text,
                    ..
                },
            ) => {
                self.editor.set_all_at(revision, text)?;
                Mutation {
                    mode: MutationMode::Replace,
                    range: 0..self.editor.read()?.chars().count(),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(mutation))
    }

    fn record(&self, action: &str, mutation: &Mutation) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_mutation(action, mutation) {
                warn!("⚠️ Failed to write audit log: {}", e);
            }
        }
    }
}

/// Convert a workflow error into the response shown to the user
fn error_response(err: &EngineError) -> AgentResponse {
    match err {
        EngineError::NoActiveSelection => AgentResponse::Error {
            kind: ErrorKind::MissingArgument,
            message: "Select some text first".to_string(),
        },
        EngineError::AuthRequired => AgentResponse::error(ErrorKind::Auth),
        EngineError::ProviderUnavailable(_) => AgentResponse::error(ErrorKind::Network),
        EngineError::Superseded => AgentResponse::Superseded,
        _ => AgentResponse::error(ErrorKind::Generic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_mapping() {
        assert!(error_response(&EngineError::AuthRequired).needs_auth());
        assert_eq!(
            error_response(&EngineError::ProviderUnavailable("refused at 10.0.0.1".into())),
            AgentResponse::error(ErrorKind::Network)
        );
        match error_response(&EngineError::NoActiveSelection) {
            AgentResponse::Error { kind, .. } => assert_eq!(kind, ErrorKind::MissingArgument),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conflict_detail_is_not_shown() {
        let response = error_response(&EngineError::MutationConflict(
            "range 3..9 is outside the document (length 5)".into(),
        ));
        assert_eq!(response, AgentResponse::error(ErrorKind::Generic));
        assert!(!response.to_string().contains("3..9"));
        assert_eq!(
            error_response(&EngineError::Superseded),
            AgentResponse::Superseded
        );
    }
}
