//! Document App API client
//!
//! Routes chat, web search and crawling through the document app's
//! authenticated HTTP API (`/api/chat` and `/api/agent`).

use super::{
    read_body, Completion, CompletionProvider, CrawlPayload, CrawlProvider, CredentialSource,
    ProviderError, ProviderResult, SearchPayload, SearchProvider,
};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct AgentResponse<T> {
    result: T,
}

/// Client for the document app API
pub struct BackendClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    timeout: Duration,
    crawl_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout: config.request_timeout(),
            crawl_timeout: config.crawl_timeout(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> ProviderResult<String> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(ProviderError::AuthRequired)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("API request: POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .timeout(timeout)
            .send()
            .await?;

        read_body(response).await
    }

    async fn agent<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        query: &str,
        timeout: Duration,
    ) -> ProviderResult<T> {
        let body = self
            .post(
                "/api/agent",
                serde_json::json!({ "query": query, "action": action }),
                timeout,
            )
            .await?;
        let parsed: AgentResponse<T> = serde_json::from_str(&body)?;
        Ok(parsed.result)
    }
}

#[async_trait]
impl CompletionProvider for BackendClient {
    async fn complete(&self, prompt: &str, session_id: &str) -> ProviderResult<Completion> {
        let body = self
            .post(
                "/api/chat",
                serde_json::json!({ "prompt": prompt, "session_id": session_id }),
                self.timeout,
            )
            .await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(Completion {
            text: parsed.response,
        })
    }

    fn name(&self) -> &str {
        "api"
    }
}

#[async_trait]
impl SearchProvider for BackendClient {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload> {
        self.agent("web_search", query, self.timeout).await
    }

    fn name(&self) -> &str {
        "api"
    }
}

#[async_trait]
impl CrawlProvider for BackendClient {
    async fn crawl(&self, url: &str) -> ProviderResult<CrawlPayload> {
        let payload: CrawlPayload = self.agent("crawl_url", url, self.crawl_timeout).await?;

        // The API reports crawl failures inside a successful response
        if payload.content.starts_with("Error:") {
            return Err(ProviderError::Unavailable(payload.content));
        }
        Ok(payload)
    }

    fn name(&self) -> &str {
        "api"
    }
}
