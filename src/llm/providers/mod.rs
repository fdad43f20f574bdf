//! Completion provider clients
//!
//! Two providers with one interface: OpenAI (primary) and a local Ollama
//! instance (fallback). Both speak the OpenAI-compatible chat-completion
//! dialect, so the request/response wire shapes live in [`wire`].

pub mod ollama;
pub mod openai;
pub mod wire;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
