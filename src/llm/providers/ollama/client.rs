//! Ollama provider client implementation
//!
//! Fallback provider backed by a local Ollama instance. Chat completions use
//! the OpenAI-compatible `/v1/chat/completions` route so the pipeline sees the
//! same contract as the primary; no authentication header is sent.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::llm::providers::wire::{
    extract_reply, ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse,
};
use crate::llm::traits::CompletionProvider;
use crate::llm::{ChatMessage, ProviderError, ProviderKind, ProviderResult};

use super::config::OllamaConfig;
use super::types::{OllamaEmbeddingRequest, OllamaEmbeddingResponse};

/// Ollama provider client
pub struct OllamaClient {
    http: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    fn handle_error_response(&self, status: u16, error_text: &str) -> ProviderError {
        let message = serde_json::from_str::<ApiErrorResponse>(error_text)
            .map(|body| body.error.message)
            .unwrap_or_else(|_| error_text.to_string());
        ProviderError::Api {
            provider: ProviderKind::Ollama,
            status,
            message,
        }
    }

    async fn embed_with_model(&self, model: &str, text: &str) -> ProviderResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let request = OllamaEmbeddingRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .headers(self.build_headers())
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(ProviderError::ResponseShape(
                "embedding response carried no vector".to_string(),
            ));
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    async fn complete(&self, conversation: &[ChatMessage]) -> ProviderResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let request = ChatCompletionRequest::new(&self.config.model, conversation);
        debug!(
            "ollama chat completion: model={}, messages={}",
            self.config.model,
            conversation.len()
        );

        let response = self
            .http
            .post(&url)
            .headers(self.build_headers())
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!("Ollama API error: {} - {}", status, error_text);
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;
        extract_reply(body)
    }

    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        match self.embed_with_model(&self.config.embedding_model, text).await {
            Ok(vector) => Ok(vector),
            Err(first_error) => {
                warn!(
                    "embedding with {} failed ({}), falling back to {}",
                    self.config.embedding_model, first_error, self.config.embedding_fallback_model
                );
                self.embed_with_model(&self.config.embedding_fallback_model, text)
                    .await
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_reports_kind_and_model() {
        let client = OllamaClient::new(OllamaConfig::default());
        assert_eq!(client.kind(), ProviderKind::Ollama);
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn api_errors_name_the_provider() {
        let client = OllamaClient::new(OllamaConfig::default());
        let err = client.handle_error_response(500, "model not loaded");
        match err {
            ProviderError::Api {
                provider, status, ..
            } => {
                assert_eq!(provider, ProviderKind::Ollama);
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
