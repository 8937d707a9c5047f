//! Groq Completion
//!
//! Direct chat completions against Groq's OpenAI-compatible endpoint.

use super::{read_body, Completion, CompletionProvider, ProviderError, ProviderResult};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

pub struct GroqCompletion {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GroqCompletion {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/chat/completions", config.groq_url.trim_end_matches('/')),
            api_key: config.groq_api_key.clone(),
            model: config.groq_model.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn parse(body: &str) -> ProviderResult<Completion> {
        let parsed: ChatCompletion = serde_json::from_str(body)?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("completion has no choices".to_string()))?;
        Ok(Completion { text })
    }
}

#[async_trait]
impl CompletionProvider for GroqCompletion {
    async fn complete(&self, prompt: &str, _session_id: &str) -> ProviderResult<Completion> {
        if self.api_key.is_empty() {
            return Err(ProviderError::AuthRequired);
        }

        debug!("🧠 Groq request ({} chars, model {})", prompt.len(), self.model);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.7,
                "max_tokens": 1000
            }))
            .timeout(self.timeout)
            .send()
            .await?;

        let body = read_body(response).await?;
        Self::parse(&body)
    }

    fn name(&self) -> &str {
        "groq"
    }
}
