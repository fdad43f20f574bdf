//! Ollama provider configuration

use std::time::Duration;

/// Configuration for the local fallback provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama server (typically http://localhost:11434)
    pub base_url: String,
    /// Chat completion model
    pub model: String,
    /// Preferred embedding model
    pub embedding_model: String,
    /// Embedding model tried when the preferred one fails
    pub embedding_fallback_model: String,
    /// Per-request timeout; local inference is slower than a hosted API
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_fallback_model: "all-minilm".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}
