//! DocPilot Library
//!
//! Command interpretation and selection-scoped editing engine for an
//! AI-assisted document editor.

pub mod assistant;
pub mod audit;
pub mod bridge;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod intent;
pub mod providers;
pub mod selection;
pub mod utils;
pub mod workflow;

pub use assistant::{Assistant, Outcome};
pub use bridge::{EditorBridge, EditorSurface, Mutation, MutationMode};
pub use dispatcher::{AgentResponse, Dispatcher, ErrorKind, SearchResult};
pub use error::{EngineError, EngineResult};
pub use intent::{classify, Intent, TransformKind, TransformScope};
pub use workflow::{PendingSuggestion, SuggestionWorkflow, WorkflowStatus};
