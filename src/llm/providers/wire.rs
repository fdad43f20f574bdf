//! OpenAI-compatible chat-completion wire shapes
//!
//! Shared by both provider clients: the fallback provider exposes the same
//! `/chat/completions` dialect as the primary. Response fields are optional
//! so a malformed reply surfaces as a shape error instead of a decode error.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, ProviderError, ProviderResult};

/// Chat message as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
}

impl ChatCompletionRequest {
    pub fn new(model: &str, conversation: &[ChatMessage]) -> Self {
        Self {
            model: model.to_string(),
            messages: conversation.iter().map(WireMessage::from).collect(),
        }
    }
}

/// Response body; every level is optional so shape validation stays explicit.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Pull the single top-choice message content out of a completion response,
/// failing with a shape error when any expected field is missing.
pub fn extract_reply(response: ChatCompletionResponse) -> ProviderResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            ProviderError::ResponseShape(
                "completion reply lacked a top-choice message content field".to_string(),
            )
        })
}

/// Error body returned by OpenAI-compatible endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}
