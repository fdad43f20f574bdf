//! OpenAI-specific wire types: embeddings and moderation
//!
//! The chat-completion shapes live in [`crate::llm::providers::wire`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Request body for `POST /embeddings`.
#[derive(Debug, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

/// Request body for `POST /moderations`.
#[derive(Debug, Serialize)]
pub struct ModerationRequest {
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResponse {
    #[serde(default)]
    pub results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    /// Category name -> whether the input hit that category.
    #[serde(default)]
    pub categories: HashMap<String, bool>,
}

impl ModerationResult {
    /// Names of the categories that actually flagged, sorted for stable logs.
    pub fn flagged_categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_positive_categories_are_reported() {
        let result: ModerationResult = serde_json::from_str(
            r#"{"flagged":true,"categories":{"hate":false,"violence":true,"self-harm":true}}"#,
        )
        .unwrap();
        assert!(result.flagged);
        assert_eq!(result.flagged_categories(), vec!["self-harm", "violence"]);
    }

    #[test]
    fn embedding_response_parses() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#).unwrap();
        assert_eq!(response.data[0].embedding.len(), 3);
    }
}
