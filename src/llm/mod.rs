//! Chat domain model and provider infrastructure
//!
//! This module defines the conversation types shared across the pipeline, the
//! provider error taxonomy, and the clients for the upstream completion
//! providers.

pub mod providers;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resilience::retry::Retryable;

/// Upstream providers the pipeline can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Wire-format role name used by the completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// Coarse sentiment attached to message metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Which provider produced an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Primary,
    Fallback,
    Error,
}

/// Optional per-message annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub learning_impact: f32,
    pub context_tags: Vec<String>,
    pub sentiment: Sentiment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
}

impl MessageMetadata {
    pub fn for_source(source: ResponseSource) -> Self {
        Self {
            learning_impact: 0.0,
            context_tags: Vec::new(),
            sentiment: Sentiment::Neutral,
            source: Some(source),
        }
    }
}

/// One message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn assistant(content: impl Into<String>, source: ResponseSource) -> Self {
        let mut message = Self::new(MessageRole::Assistant, content);
        message.metadata = Some(MessageMetadata::for_source(source));
        message
    }
}

/// Ordered, append-only sequence of messages owned by the caller for the
/// duration of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_history(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Verdict from the moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub categories: Vec<String>,
}

/// Errors from upstream provider calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Retryable for ProviderError {
    /// Transient transport failures and 5xx/429 statuses are worth retrying;
    /// a malformed shape or rejected credential will not change on retry.
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Api { status, .. } => *status >= 500 || *status == 429,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ResponseShape(_)
            | ProviderError::Serialization(_) => false,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
