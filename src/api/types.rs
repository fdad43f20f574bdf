//! Request/response schemas for the portfolio chat API

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Body for `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's message for this turn
    pub message: String,

    /// Prior conversation supplied by the caller; the server keeps no
    /// cross-request conversation of its own
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Successful chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Error body returned for every non-2xx outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body for `GET /career/recommendations`.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: String,
    pub skills: Vec<String>,
}
