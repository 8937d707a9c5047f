//! External Collaborators
//!
//! Traits for the completion, search and crawl services the engine calls but
//! does not implement, plus HTTP clients for the services the document app
//! uses.

use crate::config::Config;
use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub mod backend;
pub mod crawl;
pub mod groq;
pub mod ollama;
pub mod search;

/// Failure reported by a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network failure, timeout or refused connection
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// 401/403 from the provider. Never retried.
    #[error("authentication required")]
    AuthRequired,

    #[error("provider returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return status_error(status.as_u16(), String::new());
        }
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AuthRequired => EngineError::AuthRequired,
            other => EngineError::ProviderUnavailable(other.to_string()),
        }
    }
}

fn status_error(code: u16, body: String) -> ProviderError {
    match code {
        401 | 403 => ProviderError::AuthRequired,
        _ => ProviderError::Status { code, body },
    }
}

/// Read a response body, mapping non-success statuses to errors
pub(crate) async fn read_body(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!("❌ Provider error ({}): {}", status, truncate(&body, 200));
        return Err(status_error(status.as_u16(), body));
    }
    Ok(body)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Output of a completion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// A search hit as the provider sent it; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "link")]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Search provider output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub results: Vec<RawSearchResult>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "totalResults")]
    pub total_results: Option<usize>,
}

/// Crawl provider output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlPayload {
    #[serde(default)]
    pub content: String,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, session_id: &str) -> ProviderResult<Completion>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait CrawlProvider: Send + Sync {
    async fn crawl(&self, url: &str) -> ProviderResult<CrawlPayload>;

    fn name(&self) -> &str;
}

/// Supplies the bearer credential for authenticated providers
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, typically from config or the environment
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

/// The three collaborators the dispatcher needs
#[derive(Clone)]
pub struct Providers {
    pub completion: Arc<dyn CompletionProvider>,
    pub search: Arc<dyn SearchProvider>,
    pub crawl: Arc<dyn CrawlProvider>,
}

/// Build the configured providers
pub fn create_providers(config: &Config, credentials: Arc<dyn CredentialSource>) -> Providers {
    let backend = Arc::new(backend::BackendClient::new(config, credentials));

    info!("🛠️ Creating completion provider: {}", config.completion_backend);
    let completion: Arc<dyn CompletionProvider> = match config.completion_backend.as_str() {
        "groq" => Arc::new(groq::GroqCompletion::new(config)),
        "ollama" => Arc::new(ollama::OllamaCompletion::new(config)),
        "api" => backend.clone(),
        other => {
            warn!("  - Unknown completion backend '{}', using the API", other);
            backend.clone()
        }
    };

    let (search, crawl): (Arc<dyn SearchProvider>, Arc<dyn CrawlProvider>) =
        match config.agent_backend.as_str() {
            "direct" => (
                Arc::new(search::FallbackSearch::new(config)),
                Arc::new(crawl::HttpCrawler::new(config)),
            ),
            _ => (backend.clone(), backend),
        };

    info!(
        "✅ Providers ready: completion={}, search={}, crawl={}",
        completion.name(),
        search.name(),
        crawl.name()
    );
    Providers {
        completion,
        search,
        crawl,
    }
}
