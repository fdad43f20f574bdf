//! OpenAI provider client implementation
//!
//! Chat completions, moderation, and embeddings over the OpenAI REST API.
//! Embeddings try the preferred model first and fall back to the legacy model
//! on any failure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::llm::providers::wire::{
    extract_reply, ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse,
};
use crate::llm::traits::{CompletionProvider, ModerationClient};
use crate::llm::{ChatMessage, ModerationVerdict, ProviderError, ProviderKind, ProviderResult};

use super::config::OpenAiConfig;
use super::types::{EmbeddingRequest, EmbeddingResponse, ModerationRequest, ModerationResponse};

/// OpenAI provider client
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Build HTTP headers for requests
    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|e| ProviderError::AuthenticationFailed(format!("invalid API key format: {}", e)))?,
        );
        Ok(headers)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> ProviderResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .headers(self.build_headers()?)
            .json(body)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(e.to_string()))
    }

    /// Map a non-success status to a provider error, preferring the structured
    /// API error message when the body parses.
    fn handle_error_response(&self, status: u16, error_text: &str) -> ProviderError {
        let message = serde_json::from_str::<ApiErrorResponse>(error_text)
            .map(|body| body.error.message)
            .unwrap_or_else(|_| error_text.to_string());

        match status {
            401 | 403 => ProviderError::AuthenticationFailed(message),
            _ => ProviderError::Api {
                provider: ProviderKind::OpenAi,
                status,
                message,
            },
        }
    }

    async fn embed_with_model(&self, model: &str, text: &str) -> ProviderResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: model.to_string(),
            input: text.to_string(),
        };
        let response: EmbeddingResponse = self.post_json("/embeddings", &request).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                ProviderError::ResponseShape("embedding response carried no data".to_string())
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, conversation: &[ChatMessage]) -> ProviderResult<String> {
        let request = ChatCompletionRequest::new(&self.config.model, conversation);
        debug!(
            "openai chat completion: model={}, messages={}",
            self.config.model,
            conversation.len()
        );
        let response: ChatCompletionResponse = self.post_json("/chat/completions", &request).await?;
        extract_reply(response)
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
                    .map_err(|second_error| {
                        error!(
                            "embedding failed on both {} and {}: {}",
                            self.config.embedding_model,
                            self.config.embedding_fallback_model,
                            second_error
                        );
                        second_error
                    })
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ModerationClient for OpenAiClient {
    async fn moderate(&self, input: &str) -> ProviderResult<ModerationVerdict> {
        let request = ModerationRequest {
            input: input.to_string(),
        };
        let response: ModerationResponse = self.post_json("/moderations", &request).await?;
        let result = response.results.into_iter().next().ok_or_else(|| {
            ProviderError::ResponseShape("moderation response carried no results".to_string())
        })?;
        Ok(ModerationVerdict {
            flagged: result.flagged,
            categories: result.flagged_categories(),
        })
    }
}
