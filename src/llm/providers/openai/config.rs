//! OpenAI provider configuration

use std::time::Duration;

/// Configuration for the primary provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Chat completion model
    pub model: String,
    /// Preferred embedding model
    pub embedding_model: String,
    /// Older embedding model tried when the preferred one fails
    pub embedding_fallback_model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_fallback_model: "text-embedding-ada-002".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenAiConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}
