//! Mock Providers for Testing
//!
//! Record every call and answer from a script. A scripted step can be held
//! back by a `Notify` gate to simulate a slow provider.

use async_trait::async_trait;
use docpilot::providers::{
    Completion, CompletionProvider, CrawlPayload, CrawlProvider, ProviderError, ProviderResult,
    RawSearchResult, SearchPayload, SearchProvider,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Scripted provider answer
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Unavailable(String),
    AuthRequired,
}

impl Reply {
    fn into_result(self) -> ProviderResult<String> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Unavailable(detail) => Err(ProviderError::Unavailable(detail)),
            Reply::AuthRequired => Err(ProviderError::AuthRequired),
        }
    }
}

/// Mock completion provider
pub struct MockCompletion {
    /// Every prompt received, in order
    pub prompts: Arc<Mutex<Vec<String>>>,
    script: Mutex<VecDeque<(Reply, Option<Arc<Notify>>)>>,
    fallback: Reply,
}

impl MockCompletion {
    pub fn new(reply: &str) -> Self {
        Self::replying(Reply::Text(reply.to_string()))
    }

    pub fn replying(fallback: Reply) -> Self {
        Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            script: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    /// Queue a reply for the next call, optionally held until `gate` is notified
    pub fn push(&self, reply: Reply, gate: Option<Arc<Notify>>) {
        self.script.lock().unwrap().push_back((reply, gate));
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(&self, prompt: &str, _session_id: &str) -> ProviderResult<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let step = self.script.lock().unwrap().pop_front();
        let reply = match step {
            Some((reply, Some(gate))) => {
                gate.notified().await;
                reply
            }
            Some((reply, None)) => reply,
            None => self.fallback.clone(),
        };
        reply.into_result().map(|text| Completion { text })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock search provider
#[derive(Default)]
pub struct MockSearch {
    pub queries: Arc<Mutex<Vec<String>>>,
    pub results: Mutex<Vec<RawSearchResult>>,
    pub fail: Mutex<Option<Reply>>,
}

impl MockSearch {
    pub fn set_results(&self, results: &[(&str, &str, &str)]) {
        *self.results.lock().unwrap() = results
            .iter()
            .map(|(title, url, snippet)| RawSearchResult {
                title: Some(title.to_string()),
                url: Some(url.to_string()),
                snippet: Some(snippet.to_string()),
            })
            .collect();
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> ProviderResult<SearchPayload> {
        self.queries.lock().unwrap().push(query.to_string());
        let fail = self.fail.lock().unwrap().clone();
        if let Some(reply) = fail {
            reply.into_result()?;
        }
        Ok(SearchPayload {
            results: self.results.lock().unwrap().clone(),
            summary: None,
            total_results: None,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock crawl provider
pub struct MockCrawl {
    pub urls: Arc<Mutex<Vec<String>>>,
    content: String,
}

impl MockCrawl {
    pub fn new(content: &str) -> Self {
        Self {
            urls: Arc::new(Mutex::new(Vec::new())),
            content: content.to_string(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

#[async_trait]
impl CrawlProvider for MockCrawl {
    async fn crawl(&self, url: &str) -> ProviderResult<CrawlPayload> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(CrawlPayload {
            content: self.content.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
