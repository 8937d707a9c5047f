//! HTTP Crawler
//!
//! Fetches a page and reduces it to whitespace-collapsed visible text.

use super::{read_body, CrawlPayload, CrawlProvider, ProviderResult};
use crate::config::Config;
use crate::document::decode_entities;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

lazy_static! {
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap();
    static ref STYLE: Regex = Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

pub struct HttpCrawler {
    client: Client,
    max_chars: usize,
    timeout: Duration,
}

impl HttpCrawler {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            max_chars: config.crawl_max_chars,
            timeout: config.crawl_timeout(),
        }
    }
}

#[async_trait]
impl CrawlProvider for HttpCrawler {
    async fn crawl(&self, url: &str) -> ProviderResult<CrawlPayload> {
        debug!("🕸️ Crawling {}", url);
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let html = read_body(response).await?;

        let content = truncate_chars(&html_to_text(&html), self.max_chars);
        info!("🕸️ Crawled {} ({} chars)", url, content.chars().count());
        Ok(CrawlPayload { content })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Visible text of an HTML page, whitespace collapsed to single spaces
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT.replace_all(html, " ");
    let text = STYLE.replace_all(&text, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut to `max` chars, marking the cut with "..."
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}
