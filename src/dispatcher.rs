//! Action Dispatcher
//!
//! Runs a classified [`Intent`] against the matching provider and
//! normalizes whatever comes back into an [`AgentResponse`]. Provider
//! failures never escape: they become `AgentResponse::Error` with one
//! canonical message per [`ErrorKind`], and the detail is only logged.

use crate::bridge::EditorSurface;
use crate::intent::{Intent, TransformKind, TransformScope};
use crate::providers::{ProviderError, ProviderResult, Providers, RawSearchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Category of a failed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Provider unreachable or timed out
    Network,
    /// Credential rejected; the shell should re-authenticate
    Auth,
    Generic,
    /// The command had nothing to act on
    MissingArgument,
}

impl ErrorKind {
    /// User-facing message for the kind
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Unable to reach the service. Please check your connection and try again."
            }
            ErrorKind::Auth => "Authentication required. Please sign in again.",
            ErrorKind::Generic => "Something went wrong while processing your request.",
            ErrorKind::MissingArgument => "The command is missing an argument.",
        }
    }
}

impl From<&ProviderError> for ErrorKind {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(_) => ErrorKind::Network,
            ProviderError::AuthRequired => ErrorKind::Auth,
            ProviderError::Status { .. } | ProviderError::Malformed(_) => ErrorKind::Generic,
        }
    }
}

/// One normalized search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<RawSearchResult> for SearchResult {
    fn from(raw: RawSearchResult) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Self {
            title: non_empty(raw.title).unwrap_or_else(|| "Untitled".to_string()),
            url: raw.url.unwrap_or_default(),
            snippet: non_empty(raw.snippet)
                .unwrap_or_else(|| "No description available".to_string()),
        }
    }
}

/// Normalized result of a dispatched intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentResponse {
    Search {
        query: String,
        results: Vec<SearchResult>,
        summary: String,
        total_results: usize,
    },
    Crawl {
        content: String,
    },
    Summarize {
        content: String,
    },
    /// Chat reply or generated content
    Completion {
        text: String,
    },
    /// Rewritten text proposed by an editor transform
    Transform {
        kind: TransformKind,
        scope: TransformScope,
        text: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    /// A newer request replaced this one; nothing to show
    Superseded,
}

impl AgentResponse {
    pub fn error(kind: ErrorKind) -> Self {
        AgentResponse::Error {
            kind,
            message: kind.message().to_string(),
        }
    }

    fn missing(message: impl Into<String>) -> Self {
        AgentResponse::Error {
            kind: ErrorKind::MissingArgument,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentResponse::Error { .. })
    }

    /// True for failures the shell should answer by re-authenticating
    pub fn needs_auth(&self) -> bool {
        matches!(
            self,
            AgentResponse::Error {
                kind: ErrorKind::Auth,
                ..
            }
        )
    }
}

impl fmt::Display for AgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentResponse::Search {
                query,
                results,
                summary,
                ..
            } => {
                writeln!(f, "{}", summary)?;
                write!(f, "{}", render_results(query, results))
            }
            AgentResponse::Crawl { content } => write!(f, "{}", content),
            AgentResponse::Summarize { content } => write!(f, "{}", content),
            AgentResponse::Completion { text } => write!(f, "{}", text),
            AgentResponse::Transform { kind, text, .. } => write!(f, "[{}] {}", kind, text),
            AgentResponse::Error { message, .. } => write!(f, "Error: {}", message),
            AgentResponse::Superseded => Ok(()),
        }
    }
}

/// Insertable markup for a list of search results, in the given order
pub fn render_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("## Search results: {}\n", query);
    for result in results {
        out.push_str(&format!(
            "- **{}** ({}): {}\n",
            result.title, result.url, result.snippet
        ));
    }
    out.trim_end().to_string()
}

/// Routes intents to providers
pub struct Dispatcher {
    providers: Providers,
    editor: Arc<dyn EditorSurface>,
    session_id: String,
    max_results: usize,
}

impl Dispatcher {
    pub fn new(
        providers: Providers,
        editor: Arc<dyn EditorSurface>,
        session_id: impl Into<String>,
        max_results: usize,
    ) -> Self {
        Self {
            providers,
            editor,
            session_id: session_id.into(),
            max_results,
        }
    }

    /// Execute one intent. Exactly one provider call at most, never retried.
    pub async fn dispatch(&self, intent: &Intent) -> AgentResponse {
        debug!("🎯 Dispatching {}", intent.name());
        match intent {
            Intent::WebSearch { query, .. } => self.search(query).await,
            Intent::Crawl { url } => match self.providers.crawl.crawl(url).await {
                Ok(payload) => AgentResponse::Crawl {
                    content: payload.content,
                },
                Err(e) => self.fail("crawl", e),
            },
            Intent::Summarize { text } => self.summarize(text.as_deref()).await,
            Intent::EditorTransform { kind, scope } => self.transform(*kind, *scope).await,
            Intent::CreateAndInsert { prompt } => {
                match self.complete(&generation_prompt(prompt)).await {
                    Ok(text) => AgentResponse::Completion { text },
                    Err(e) => self.fail("generation", e),
                }
            }
            Intent::Chat {
                missing: Some(message),
                ..
            } => {
                info!("Command rejected before dispatch: {}", message);
                AgentResponse::missing(message.clone())
            }
            Intent::Chat { prompt, .. } => match self.complete(prompt).await {
                Ok(text) => AgentResponse::Completion { text },
                Err(e) => self.fail("chat", e),
            },
        }
    }

    async fn search(&self, query: &str) -> AgentResponse {
        let payload = match self.providers.search.search(query).await {
            Ok(payload) => payload,
            Err(e) => return self.fail("search", e),
        };

        let results: Vec<SearchResult> = payload
            .results
            .into_iter()
            .take(self.max_results)
            .map(SearchResult::from)
            .collect();
        let total_results = payload.total_results.unwrap_or(results.len());
        let summary = payload
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("Found {} results for: {}", results.len(), query));

        info!("🔎 Search '{}' returned {} results", query, results.len());
        AgentResponse::Search {
            query: query.to_string(),
            results,
            summary,
            total_results,
        }
    }

    async fn summarize(&self, text: Option<&str>) -> AgentResponse {
        let source = match text {
            Some(text) => text.to_string(),
            None => match self.editor.read() {
                Ok(text) => text,
                Err(e) => {
                    warn!("❌ Could not read document: {}", e);
                    return AgentResponse::error(ErrorKind::Generic);
                }
            },
        };
        if source.trim().is_empty() {
            return AgentResponse::missing("Nothing to summarize");
        }

        match self.complete(&TransformKind::Summarize.prompt(&source)).await {
            Ok(content) => AgentResponse::Summarize { content },
            Err(e) => self.fail("summarize", e),
        }
    }

    async fn transform(&self, kind: TransformKind, scope: TransformScope) -> AgentResponse {
        // Selection rewrites carry an anchor and belong to the suggestion workflow
        if scope == TransformScope::Selection {
            return AgentResponse::missing("No text selected");
        }
        // A document summary is shown, never written back
        if kind == TransformKind::Summarize {
            return self.summarize(None).await;
        }

        let source = match self.editor.read() {
            Ok(text) => text,
            Err(e) => {
                warn!("❌ Could not read document: {}", e);
                return AgentResponse::error(ErrorKind::Generic);
            }
        };
        if source.trim().is_empty() {
            return AgentResponse::missing("The document is empty");
        }

        match self.complete(&kind.prompt(&source)).await {
            Ok(text) => AgentResponse::Transform { kind, scope, text },
            Err(e) => self.fail(kind.as_str(), e),
        }
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let completion = self
            .providers
            .completion
            .complete(prompt, &self.session_id)
            .await?;
        Ok(completion.text.trim().to_string())
    }

    /// Log provider detail and return the canonical error
    fn fail(&self, action: &str, err: ProviderError) -> AgentResponse {
        let kind = ErrorKind::from(&err);
        warn!("❌ {} failed ({:?}): {}", action, kind, err);
        AgentResponse::error(kind)
    }
}

fn generation_prompt(description: &str) -> String {
    format!(
        "Write the following content for a document. Use markdown headings and lists where they help. Respond with only the content.\n\n{}",
        description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_defaults() {
        let result = SearchResult::from(RawSearchResult {
            title: Some("  ".to_string()),
            url: Some("https://a.io".to_string()),
            snippet: None,
        });
        assert_eq!(result.title, "Untitled");
        assert_eq!(result.snippet, "No description available");
        assert_eq!(result.url, "https://a.io");
    }

    #[test]
    fn test_render_results_keeps_order() {
        let results = vec![
            SearchResult {
                title: "B".into(),
                url: "https://b.io".into(),
                snippet: "second".into(),
            },
            SearchResult {
                title: "A".into(),
                url: "https://a.io".into(),
                snippet: "first".into(),
            },
        ];
        assert_eq!(
            render_results("rag", &results),
            "## Search results: rag\n- **B** (https://b.io): second\n- **A** (https://a.io): first"
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            ErrorKind::from(&ProviderError::Unavailable("refused".into())),
            ErrorKind::Network
        );
        assert_eq!(ErrorKind::from(&ProviderError::AuthRequired), ErrorKind::Auth);
        assert_eq!(
            ErrorKind::from(&ProviderError::Status {
                code: 500,
                body: "trace".into()
            }),
            ErrorKind::Generic
        );
    }

    #[test]
    fn test_error_message_is_canonical() {
        let response = AgentResponse::error(ErrorKind::Auth);
        assert!(response.needs_auth());
        assert_eq!(response.to_string(), "Error: Authentication required. Please sign in again.");
    }

    #[test]
    fn test_response_json_shape() {
        let json = serde_json::to_value(AgentResponse::Crawl {
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "crawl");
        assert_eq!(json["content"], "hi");
    }
}
