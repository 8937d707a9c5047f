#![allow(dead_code)]

pub mod http_stub;
pub mod mock_providers;

use docpilot::bridge::EditorBridge;
use docpilot::config::Config;
use docpilot::document::Document;
use docpilot::providers::Providers;
use docpilot::Assistant;
use mock_providers::{MockCompletion, MockCrawl, MockSearch};
use std::sync::Arc;

/// An assistant wired to mock providers over an in-memory document
pub struct TestContext {
    pub editor: EditorBridge,
    pub completion: Arc<MockCompletion>,
    pub search: Arc<MockSearch>,
    pub crawl: Arc<MockCrawl>,
    pub assistant: Assistant,
}

impl TestContext {
    pub fn new(text: &str) -> Self {
        Self::with_completion(text, MockCompletion::new("ok"))
    }

    pub fn with_completion(text: &str, completion: MockCompletion) -> Self {
        let editor = EditorBridge::new(Document::from_text(text));
        let completion = Arc::new(completion);
        let search = Arc::new(MockSearch::default());
        let crawl = Arc::new(MockCrawl::new("Crawled page text"));

        let providers = Providers {
            completion: completion.clone(),
            search: search.clone(),
            crawl: crawl.clone(),
        };
        let assistant = Assistant::new(&Config::default(), Arc::new(editor.clone()), providers);

        Self {
            editor,
            completion,
            search,
            crawl,
            assistant,
        }
    }
}
