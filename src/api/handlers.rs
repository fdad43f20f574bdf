//! HTTP handlers for the portfolio chat API

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse, ErrorResponse, RecommendationsResponse};
use crate::llm::traits::CompletionProvider;
use crate::pipeline::{ChatPipeline, ChatTurn, PipelineError};
use crate::profile::{self, ProfileStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub primary: Arc<dyn CompletionProvider>,
    pub profiles: Arc<ProfileStore>,
}

/// HTTP projection of a pipeline outcome.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Identification => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::EmptyMessage | PipelineError::MessageTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::InputFlagged { .. } => StatusCode::FORBIDDEN,
            PipelineError::OutputFlagged { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::ModerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::AllProvidersUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Resolve the client identifier from request headers: `x-client-id` first,
/// then the first hop of `x-forwarded-for`.
pub fn client_identifier(headers: &HeaderMap) -> Option<String> {
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    from_header("x-client-id")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            from_header("x-forwarded-for")
                .and_then(|value| value.split(',').next().map(|hop| hop.trim().to_string()))
                .filter(|value| !value.is_empty())
        })
}

/// Chat endpoint - POST /chat
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!("processing chat request ({} history messages)", request.history.len());

    let turn = ChatTurn {
        client_id: client_identifier(&headers),
        message: request.message,
        history: request.history,
    };

    let reply = state.pipeline.handle(turn).await?;
    Ok(Json(ChatResponse {
        response: reply.text,
    }))
}

/// Health check endpoint - GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let circuit = state.pipeline.primary_circuit_state().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "portfolio-chat",
        "version": env!("CARGO_PKG_VERSION"),
        "primary_circuit": circuit.to_string(),
    }))
}

/// Career recommendations endpoint - GET /career/recommendations
///
/// Extracts skills from the caller's session history, folds them into the
/// profile, and generates recommendations through the primary provider.
pub async fn career_recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let client_id =
        client_identifier(&headers).ok_or_else(|| ApiError::from(PipelineError::Identification))?;

    let profile = state
        .profiles
        .get(&client_id)
        .ok_or_else(|| ApiError::not_found("no session profile for this client"))?;

    let skills = profile::extract_skills(state.primary.as_ref(), &profile.conversation_history)
        .await
        .map_err(|err| ApiError::from(PipelineError::Upstream(err)))?;
    state.profiles.add_skills(&client_id, skills);

    let profile = state.profiles.get(&client_id).unwrap_or(profile);
    let recommendations = profile::career_recommendations(state.primary.as_ref(), &profile)
        .await
        .map_err(|err| ApiError::from(PipelineError::Upstream(err)))?;

    Ok(Json(RecommendationsResponse {
        recommendations,
        skills: profile.skills,
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_id_header_wins_over_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-id", HeaderValue::from_static("visitor-42"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 10.0.0.2"),
        );
        assert_eq!(client_identifier(&headers).as_deref(), Some("visitor-42"));
    }

    #[test]
    fn forwarded_for_uses_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(client_identifier(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn missing_headers_yield_no_identifier() {
        let headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers), None);
    }

    #[test]
    fn status_mapping_matches_the_contract() {
        let cases: Vec<(PipelineError, StatusCode)> = vec![
            (PipelineError::Identification, StatusCode::INTERNAL_SERVER_ERROR),
            (PipelineError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (PipelineError::EmptyMessage, StatusCode::BAD_REQUEST),
            (
                PipelineError::MessageTooLong {
                    length: 501,
                    limit: 500,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::InputFlagged { categories: vec![] },
                StatusCode::FORBIDDEN,
            ),
            (
                PipelineError::OutputFlagged {
                    reason: "term".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::CircuitOpen("openai".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PipelineError::AllProvidersUnavailable,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn rate_limit_error_body_names_too_many_requests() {
        let api_error = ApiError::from(PipelineError::RateLimited);
        assert!(api_error.message.starts_with("Too many requests"));
    }
}
