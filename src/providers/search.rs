//! Web Search Providers
//!
//! Serper (Google results, needs an API key), the DuckDuckGo Instant Answer
//! API, and a fallback chain over both.

use super::{read_body, ProviderError, ProviderResult, RawSearchResult, SearchPayload, SearchProvider};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Serper API search
pub struct SerperSearch {
    client: Client,
    url: String,
    api_key: String,
    num_results: usize,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<RawSearchResult>,
}

impl SerperSearch {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: config.serper_url.clone(),
            api_key: config.serper_api_key.clone(),
            num_results: config.search_results,
            timeout: config.request_timeout(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload> {
        if !self.is_configured() {
            return Err(ProviderError::AuthRequired);
        }

        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query, "num": self.num_results }))
            .timeout(self.timeout)
            .send()
            .await?;

        let body = read_body(response).await?;
        let parsed: SerperResponse = serde_json::from_str(&body)?;
        Ok(SearchPayload {
            results: parsed.organic,
            summary: None,
            total_results: None,
        })
    }

    fn name(&self) -> &str {
        "serper"
    }
}

/// DuckDuckGo Instant Answer API search
pub struct DuckDuckGoSearch {
    client: Client,
    url: String,
    num_results: usize,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DuckDuckGoResponse {
    #[serde(default)]
    related_topics: Vec<serde_json::Value>,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "Abstract")]
    abstract_: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: config.duckduckgo_url.clone(),
            num_results: config.search_results,
            timeout: config.request_timeout(),
        }
    }

    /// Map an Instant Answer body to results
    fn parse(body: &str, query: &str, limit: usize) -> ProviderResult<Vec<RawSearchResult>> {
        let parsed: DuckDuckGoResponse = serde_json::from_str(body)?;

        let mut results: Vec<RawSearchResult> = parsed
            .related_topics
            .iter()
            .filter_map(|topic| {
                let text = topic.get("Text")?.as_str()?;
                Some(RawSearchResult {
                    title: text.split(" - ").next().map(str::to_string),
                    url: topic
                        .get("FirstURL")
                        .and_then(|u| u.as_str())
                        .map(str::to_string),
                    snippet: Some(text.to_string()),
                })
            })
            .take(limit)
            .collect();

        let abstract_text = if parsed.abstract_.is_empty() {
            parsed.abstract_text
        } else {
            parsed.abstract_
        };
        if results.is_empty() && !abstract_text.is_empty() {
            results.push(RawSearchResult {
                title: Some(format!("About {}", query)),
                url: Some(parsed.abstract_url),
                snippet: Some(abstract_text),
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let body = read_body(response).await?;
        let results = Self::parse(&body, query, self.num_results)?;
        Ok(SearchPayload {
            results,
            summary: None,
            total_results: None,
        })
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Serper when configured, then DuckDuckGo, then a placeholder result
pub struct FallbackSearch {
    serper: SerperSearch,
    duckduckgo: DuckDuckGoSearch,
}

impl FallbackSearch {
    pub fn new(config: &Config) -> Self {
        Self {
            serper: SerperSearch::new(config),
            duckduckgo: DuckDuckGoSearch::new(config),
        }
    }

    /// Result shown when no provider returned anything
    fn placeholder(query: &str) -> RawSearchResult {
        RawSearchResult {
            title: Some(format!("Mock Result for: {}", query)),
            url: Some(format!(
                "https://example.com/search?q={}",
                urlencoding::encode(query)
            )),
            snippet: Some(format!(
                "This is a placeholder result for '{}'. Configure SERPER_API_KEY for real results.",
                query
            )),
        }
    }
}

#[async_trait]
impl SearchProvider for FallbackSearch {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload> {
        if self.serper.is_configured() {
            match self.serper.search(query).await {
                Ok(payload) if !payload.results.is_empty() => {
                    info!("🔎 Found {} results using Serper", payload.results.len());
                    return Ok(payload);
                }
                Ok(_) => debug!("Serper returned no results"),
                Err(e) => warn!("⚠️ Serper search error: {}", e),
            }
        }

        match self.duckduckgo.search(query).await {
            Ok(payload) if !payload.results.is_empty() => {
                info!("🔎 Found {} results using DuckDuckGo", payload.results.len());
                return Ok(payload);
            }
            Ok(_) => debug!("DuckDuckGo returned no results"),
            Err(e) => warn!("⚠️ DuckDuckGo search error: {}", e),
        }

        warn!("No web search results found, returning placeholder");
        Ok(SearchPayload {
            results: vec![Self::placeholder(query)],
            summary: None,
            total_results: None,
        })
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
