//! Chat request pipeline
//!
//! Orchestrates one request end to end: admission (client identity, rate
//! limit), validation, input moderation, best-effort context enrichment,
//! circuit-guarded and retried primary completion with optional fallback,
//! and output filtering. Each step commits its side effect independently;
//! there is no cross-step transaction.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::context::{format_context, ContextRetriever};
use crate::llm::traits::CompletionProvider;
use crate::llm::{ChatMessage, Conversation, ProviderError, ResponseSource};
use crate::profile::ProfileStore;
use crate::resilience::{
    retry_with_backoff, CircuitBreaker, CircuitError, CircuitState, RateLimiter, RetryPolicy,
};
use crate::safety::{GateDecision, ModerationGate, ResponseFilter};

/// Terminal pipeline outcomes that map to distinct HTTP results.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("client identifier unavailable")]
    Identification,

    #[error("Too many requests: rate limit exceeded, try again later")]
    RateLimited,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message exceeds maximum length of {limit} characters (got {length})")]
    MessageTooLong { length: usize, limit: usize },

    #[error("message rejected by content policy")]
    InputFlagged { categories: Vec<String> },

    #[error("response withheld by content policy: {reason}")]
    OutputFlagged { reason: String },

    #[error("moderation service unavailable")]
    ModerationUnavailable(#[source] ProviderError),

    #[error("provider {0} is temporarily unavailable (circuit open)")]
    CircuitOpen(String),

    #[error("all providers unavailable")]
    AllProvidersUnavailable,

    #[error("upstream failure: {0}")]
    Upstream(#[source] ProviderError),
}

/// Tunables for one pipeline instance. Defaults follow the documented
/// contract: threshold 3, reset 60s, window 60s / 10 requests, 3 retries at
/// 200ms base delay, 500-character messages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fallback_enabled: bool,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub rate_window: Duration,
    pub rate_limit: u32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_message_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(60_000),
            rate_window: Duration::from_millis(60_000),
            rate_limit: 10,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
            max_message_chars: 500,
        }
    }
}

/// One inbound chat turn as resolved by the HTTP layer.
#[derive(Debug)]
pub struct ChatTurn {
    pub client_id: Option<String>,
    pub message: String,
    pub history: Vec<ChatMessage>,
}

/// Successful pipeline outcome.
#[derive(Debug)]
pub struct ChatReply {
    pub text: String,
    pub source: ResponseSource,
    pub conversation: Conversation,
}

/// The request-handling state machine, owning all shared per-process state
/// (breaker, rate windows, profiles).
pub struct ChatPipeline {
    primary: Arc<dyn CompletionProvider>,
    fallback: Option<Arc<dyn CompletionProvider>>,
    moderation: ModerationGate,
    filter: ResponseFilter,
    context: Option<Arc<dyn ContextRetriever>>,
    profiles: Arc<ProfileStore>,
    rate_limiter: RateLimiter,
    primary_breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
    config: PipelineConfig,
}

impl ChatPipeline {
    pub fn new(
        primary: Arc<dyn CompletionProvider>,
        fallback: Option<Arc<dyn CompletionProvider>>,
        moderation: ModerationGate,
        filter: ResponseFilter,
        context: Option<Arc<dyn ContextRetriever>>,
        profiles: Arc<ProfileStore>,
        config: PipelineConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_window, config.rate_limit);
        let primary_breaker = CircuitBreaker::new(
            primary.kind().to_string(),
            config.failure_threshold,
            config.reset_timeout,
        );
        let retry_policy = RetryPolicy::new(config.max_retries, config.retry_base_delay);

        Self {
            primary,
            fallback,
            moderation,
            filter,
            context,
            profiles,
            rate_limiter,
            primary_breaker,
            retry_policy,
            config,
        }
    }

    /// Current state of the primary provider's breaker.
    pub async fn primary_circuit_state(&self) -> CircuitState {
        self.primary_breaker.state().await
    }

    /// Run one request through the full pipeline.
    pub async fn handle(&self, turn: ChatTurn) -> Result<ChatReply, PipelineError> {
        // Step 1: admission.
        let client_id = turn
            .client_id
            .as_deref()
            .ok_or(PipelineError::Identification)?;
        if !self.rate_limiter.admit(client_id) {
            info!("rate limit exceeded for client {}", client_id);
            return Err(PipelineError::RateLimited);
        }

        // Step 2: validation.
        let message = turn.message.trim();
        if message.is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        let length = message.chars().count();
        if length > self.config.max_message_chars {
            return Err(PipelineError::MessageTooLong {
                length,
                limit: self.config.max_message_chars,
            });
        }

        // Step 3: input moderation.
        match self.moderation.screen(message).await {
            GateDecision::Clear => {}
            GateDecision::Flagged(verdict) => {
                return Err(PipelineError::InputFlagged {
                    categories: verdict.categories,
                });
            }
            GateDecision::Unavailable(err) => {
                return Err(PipelineError::ModerationUnavailable(err));
            }
        }

        let mut conversation = Conversation::from_history(turn.history);
        let user_message = ChatMessage::user(message);

        // Step 4: best-effort context enrichment. A retrieval failure never
        // fails the request.
        let mut prompt: Vec<ChatMessage> = conversation.messages().to_vec();
        if let Some(retriever) = &self.context {
            match retriever.retrieve(message).await {
                Ok(snippets) if !snippets.is_empty() => {
                    debug!("enriching prompt with {} context snippets", snippets.len());
                    prompt.push(ChatMessage::system(format_context(&snippets)));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("context retrieval failed, continuing without context: {}", err);
                }
            }
        }
        prompt.push(user_message.clone());

        // Step 5: resilient completion.
        let (raw_reply, source) = self.complete_with_resilience(&prompt).await?;

        // Step 6: output filtering. A flagged reply is withheld entirely.
        let filtered = self.filter.filter(&raw_reply);
        if filtered.flagged {
            let reason = filtered
                .reason
                .unwrap_or_else(|| "forbidden content".to_string());
            warn!("reply from {} withheld: {}", source_name(source), reason);
            return Err(PipelineError::OutputFlagged { reason });
        }

        // Step 7: commit the exchange.
        let assistant_message = ChatMessage::assistant(filtered.filtered_text.clone(), source);
        conversation.push(user_message.clone());
        conversation.push(assistant_message.clone());
        self.profiles
            .record_exchange(client_id, &user_message, &assistant_message);

        Ok(ChatReply {
            text: filtered.filtered_text,
            source,
            conversation,
        })
    }

    /// Invoke the primary provider through the retrier inside the breaker, so
    /// an admitted request records exactly one breaker observation once its
    /// retry budget is spent. On primary exhaustion or an open circuit the
    /// fallback (when enabled) is called directly, without its own retry or
    /// breaker.
    async fn complete_with_resilience(
        &self,
        prompt: &[ChatMessage],
    ) -> Result<(String, ResponseSource), PipelineError> {
        let attempt = self
            .primary_breaker
            .guard(|| {
                retry_with_backoff(&self.retry_policy, || self.primary.complete(prompt))
            })
            .await;

        let primary_error = match attempt {
            Ok(text) => return Ok((text, ResponseSource::Primary)),
            Err(err) => err,
        };

        let circuit_state = self.primary_breaker.state().await;
        warn!(
            "primary provider {} failed (circuit {}): {}",
            self.primary.kind(),
            circuit_state,
            primary_error
        );

        match (&self.fallback, self.config.fallback_enabled) {
            (Some(fallback), true) => {
                info!("invoking fallback provider {}", fallback.kind());
                match fallback.complete(prompt).await {
                    Ok(text) => Ok((text, ResponseSource::Fallback)),
                    Err(fallback_error) => {
                        error!(
                            "fallback provider {} failed after primary ({}): {}",
                            fallback.kind(),
                            primary_error,
                            fallback_error
                        );
                        Err(PipelineError::AllProvidersUnavailable)
                    }
                }
            }
            _ => Err(match primary_error {
                CircuitError::Open(provider) => PipelineError::CircuitOpen(provider),
                CircuitError::Upstream(err) => PipelineError::Upstream(err),
            }),
        }
    }
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Primary => "primary",
        ResponseSource::Fallback => "fallback",
        ResponseSource::Error => "error",
    }
}
