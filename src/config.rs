use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Document app API
    pub api_base_url: String,
    pub api_token: String,
    pub session_id: String,

    // Completion
    /// "api", "groq" or "ollama"
    pub completion_backend: String,
    pub groq_url: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,

    // Search / crawl
    /// "api" routes search and crawl through the document app, "direct" calls providers
    pub agent_backend: String,
    pub serper_url: String,
    pub serper_api_key: String,
    pub duckduckgo_url: String,
    pub search_results: usize,
    pub crawl_max_chars: usize,

    // Timeouts (seconds)
    pub request_timeout_secs: u64,
    pub crawl_timeout_secs: u64,

    // Classification
    pub action_match_cutoff: f64,
    pub command_corrections: HashMap<String, String>,

    // Meta
    pub log_level: String,
    pub audit_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            api_token: "".to_string(),
            session_id: "default_session".to_string(),
            completion_backend: "api".to_string(),
            groq_url: "https://api.groq.com/openai/v1".to_string(),
            groq_api_key: "".to_string(),
            groq_model: "meta-llama/llama-4-maverick-17b-128e-instruct".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            agent_backend: "api".to_string(),
            serper_url: "https://google.serper.dev/search".to_string(),
            serper_api_key: "".to_string(),
            duckduckgo_url: "https://api.duckduckgo.com/".to_string(),
            search_results: 5,
            crawl_max_chars: 2000,
            request_timeout_secs: 10,
            crawl_timeout_secs: 30,
            action_match_cutoff: 0.7,
            command_corrections: HashMap::from([
                ("serach".to_string(), "search".to_string()),
                ("grammer".to_string(), "grammar".to_string()),
                ("summerize".to_string(), "summarize".to_string()),
                ("profesional".to_string(), "professional".to_string()),
            ]),
            log_level: "info".to_string(),
            audit_enabled: true,
        }
    }
}

impl Config {
    /// Load config from the default location, or defaults when missing
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                // Backup corrupt file for debugging
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override secrets and endpoints from the environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("DOCPILOT_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = non_empty("DOCPILOT_TOKEN") {
            self.api_token = v;
        }
        if let Some(v) = non_empty("GROQ_API_KEY") {
            self.groq_api_key = v;
        }
        if let Some(v) = non_empty("SERPER_API_KEY") {
            self.serper_api_key = v;
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn crawl_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.crawl_timeout_secs)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docpilot")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.completion_backend, "api");
        assert_eq!(config.search_results, 5);
        assert_eq!(config.crawl_max_chars, 2000);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.audit_enabled);
    }

    #[test]
    fn test_config_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = Config::default();
        config.groq_model = "test-model".to_string();
        config.save_to(&path).unwrap();

        let restored = Config::load_from(&path).unwrap();
        assert_eq!(restored.groq_model, "test-model");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"search_results": 3}"#).unwrap();
        assert_eq!(config.search_results, 3);
        assert_eq!(config.crawl_max_chars, 2000);
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.search_results, 5);
        assert!(dir.path().join("config.json.corrupt").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_vars(|key| match key {
            "GROQ_API_KEY" => Some("gsk_test".to_string()),
            "SERPER_API_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.groq_api_key, "gsk_test");
        assert_eq!(config.serper_api_key, "");
    }
}
