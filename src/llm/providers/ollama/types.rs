//! Ollama-specific wire types
//!
//! Chat completions go through Ollama's OpenAI-compatible `/v1` route (shapes
//! in [`crate::llm::providers::wire`]); embeddings use the native API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/embeddings`.
#[derive(Debug, Serialize)]
pub struct OllamaEmbeddingRequest {
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct OllamaEmbeddingResponse {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_response_parses() {
        let response: OllamaEmbeddingResponse =
            serde_json::from_str(r#"{"embedding":[0.5,-0.25]}"#).unwrap();
        assert_eq!(response.embedding, vec![0.5, -0.25]);
    }
}
