//! Provider traits
//!
//! The pipeline treats the primary and fallback providers uniformly through
//! [`CompletionProvider`]; moderation goes through its own narrower trait so
//! the gate does not depend on completion capability.

use async_trait::async_trait;

use super::{ChatMessage, ModerationVerdict, ProviderKind, ProviderResult};

/// A chat-completion upstream. Both configured instances (primary and
/// fallback) implement this with their own endpoint and model configuration.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the conversation and return the single top-choice reply text.
    ///
    /// Fails with [`ProviderError::ResponseShape`](super::ProviderError) when
    /// the reply lacks the expected top-choice message content.
    async fn complete(&self, conversation: &[ChatMessage]) -> ProviderResult<String>;

    /// Embed `text`, trying the preferred embedding model first and an older
    /// fallback model if the preferred one fails.
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>>;

    fn kind(&self) -> ProviderKind;

    /// Model identifier used for completions.
    fn model(&self) -> &str;
}

/// Classifies user-supplied text against the content policy.
#[async_trait]
pub trait ModerationClient: Send + Sync {
    async fn moderate(&self, input: &str) -> ProviderResult<ModerationVerdict>;
}
