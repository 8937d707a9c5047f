//! Ollama Completion
//!
//! Local LLM completions through Ollama's generate API.

use super::{read_body, Completion, CompletionProvider, ProviderResult};
use crate::config::Config;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Ollama API response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Handles Ollama LLM completions
#[derive(Clone)]
pub struct OllamaCompletion {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaCompletion {
    /// Create new Ollama provider from config
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// Health check - verify Ollama is reachable
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("⚠️ Ollama not reachable at {}: {}", self.url, e);
                false
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletion {
    async fn complete(&self, prompt: &str, _session_id: &str) -> ProviderResult<Completion> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": 0.7,
                    "num_predict": 1000
                }
            }))
            .timeout(self.timeout)
            .send()
            .await?;

        let body = read_body(response).await?;
        debug!("🧠 Ollama raw body: {}", body);

        let parsed: OllamaResponse = serde_json::from_str(&body)?;
        Ok(Completion {
            text: parsed.response.trim().to_string(),
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let config = Config {
            ollama_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let provider = OllamaCompletion::new(&config);
        assert!(!provider.health_check().await);
        assert!(matches!(
            provider.complete("hi", "s").await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
