// Portfolio chat HTTP API
// This module wires the chat pipeline into an axum server

pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use handlers::{career_recommendations, chat, health, not_found, AppState};

/// API server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Portfolio chat API server
pub struct ChatApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ChatApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Create the axum router with all routes
    pub fn create_router(&self) -> Router {
        let router = Router::new()
            .route("/chat", post(chat))
            .route("/health", get(health))
            .route("/career/recommendations", get(career_recommendations))
            .fallback(not_found)
            .with_state(self.state.clone());

        if self.config.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.create_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!("Portfolio chat API starting");
        info!("Server address: http://{}", addr);
        info!("Endpoints:");
        info!("   POST http://{}/chat", addr);
        info!("   GET  http://{}/health", addr);
        info!("   GET  http://{}/career/recommendations", addr);

        axum::Server::bind(&addr.parse()?)
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}
