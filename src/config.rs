//! Environment-driven application configuration
//!
//! All tunables come from environment variables (loaded from `.env` by the
//! server binary); every knob except the provider API key has a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::providers::ollama::OllamaConfig;
use crate::llm::providers::openai::OpenAiConfig;
use crate::pipeline::PipelineConfig;
use crate::safety::ModerationFailurePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
    pub pipeline: PipelineConfig,
    pub forbidden_terms: Vec<String>,
    pub moderation_failure_policy: ModerationFailurePolicy,
    pub context_index_url: Option<String>,
    pub context_index_api_key: String,
    pub context_top_k: usize,
    pub profile_max_history: usize,
    pub profile_max_skills: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30u64)?);

        let openai = OpenAiConfig {
            api_key,
            base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
            embedding_model: var_or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_fallback_model: var_or(
                "OPENAI_EMBEDDING_FALLBACK_MODEL",
                "text-embedding-ada-002",
            ),
            timeout: request_timeout,
        };

        let ollama = OllamaConfig {
            base_url: var_or("OLLAMA_BASE_URL", "http://localhost:11434"),
            model: var_or("OLLAMA_MODEL", "llama3.2"),
            ..OllamaConfig::default()
        };

        let pipeline = PipelineConfig {
            fallback_enabled: parse_var("FALLBACK_ENABLED", true)?,
            failure_threshold: parse_var("FAILURE_THRESHOLD", 3u32)?,
            reset_timeout: Duration::from_millis(parse_var("RESET_TIMEOUT_MS", 60_000u64)?),
            rate_window: Duration::from_millis(parse_var("RATE_LIMIT_WINDOW_MS", 60_000u64)?),
            rate_limit: parse_var("RATE_LIMIT_MAX_REQUESTS", 10u32)?,
            max_retries: parse_var("MAX_RETRIES", 3u32)?,
            retry_base_delay: Duration::from_millis(parse_var("RETRY_BASE_DELAY_MS", 200u64)?),
            max_message_chars: parse_var("MAX_MESSAGE_CHARS", 500usize)?,
        };

        Ok(Self {
            host: var_or("SERVER_HOST", "0.0.0.0"),
            port: parse_var("SERVER_PORT", 8080u16)?,
            cors_enabled: parse_var("CORS_ENABLED", true)?,
            openai,
            ollama,
            pipeline,
            forbidden_terms: parse_terms(&var_or("FORBIDDEN_TERMS", "")),
            moderation_failure_policy: parse_var(
                "MODERATION_FAIL_POLICY",
                ModerationFailurePolicy::FailClosed,
            )?,
            context_index_url: env::var("CONTEXT_INDEX_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            context_index_api_key: var_or("CONTEXT_INDEX_API_KEY", ""),
            context_top_k: parse_var("CONTEXT_TOP_K", 5usize)?,
            profile_max_history: parse_var("PROFILE_MAX_HISTORY", 100usize)?,
            profile_max_skills: parse_var("PROFILE_MAX_SKILLS", 50usize)?,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let parsed = raw.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::InvalidVar { name, value: raw })
        }
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated forbidden-term list, dropping empty entries.
fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_split_on_commas_and_skip_blanks() {
        assert_eq!(
            parse_terms("gambling, crypto scheme ,,  "),
            vec!["gambling", "crypto scheme"]
        );
        assert!(parse_terms("").is_empty());
    }

    #[test]
    fn parse_var_uses_default_when_unset() {
        assert_eq!(
            parse_var("PORTFOLIO_CHAT_UNSET_TEST_VAR", 42u32).unwrap(),
            42
        );
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("PORTFOLIO_CHAT_GARBAGE_TEST_VAR", "not-a-number");
        let result = parse_var("PORTFOLIO_CHAT_GARBAGE_TEST_VAR", 1u32);
        assert!(matches!(result, Err(ConfigError::InvalidVar { .. })));
        env::remove_var("PORTFOLIO_CHAT_GARBAGE_TEST_VAR");
    }
}
