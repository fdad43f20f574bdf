// Portfolio Chat - Rust Edition
// A moderated, provider-resilient chat backend for a portfolio site

//! # Portfolio Chat Library
//!
//! The core of this crate is a chat request pipeline that turns a user
//! message into a moderated, provider-resilient AI response:
//!
//! - [`resilience`]: retry with exponential backoff, a per-provider circuit
//!   breaker, and a fixed-window rate limiter
//! - [`llm`]: the conversation model, provider error taxonomy, and the
//!   OpenAI/Ollama provider clients behind one [`llm::traits::CompletionProvider`]
//!   trait
//! - [`safety`]: input moderation gating and output term filtering
//! - [`context`]: best-effort retrieval of portfolio snippets for grounding
//! - [`profile`]: bounded per-client session profiles and the career prompts
//!   built on them
//! - [`pipeline`]: the orchestration tying the steps together
//! - [`api`]: the axum HTTP surface (`POST /chat` and friends)
//!
//! All shared state (circuit, rate windows, profiles) is in-process and
//! scoped to one server instance.

pub mod api;
pub mod config;
pub mod context;
pub mod llm;
pub mod pipeline;
pub mod profile;
pub mod resilience;
pub mod safety;

// Re-export the types most callers need at the crate root
pub use api::{ApiConfig, ChatApiServer};
pub use config::{AppConfig, ConfigError};
pub use llm::{
    ChatMessage, Conversation, MessageRole, ModerationVerdict, ProviderError, ProviderKind,
    ResponseSource,
};
pub use pipeline::{ChatPipeline, ChatReply, ChatTurn, PipelineConfig, PipelineError};
pub use resilience::{CircuitBreaker, CircuitState, RateLimiter, RetryPolicy};
pub use safety::{FilterResult, ModerationFailurePolicy, ModerationGate, ResponseFilter};
