//! Ollama provider (fallback)

pub mod client;
pub mod config;
pub mod types;

pub use client::OllamaClient;
pub use config::OllamaConfig;
