// Portfolio Chat - API server
// Run with: cargo run --bin server

use std::sync::Arc;

use dotenv::dotenv;
use tracing::info;

use portfolio_chat::api::handlers::AppState;
use portfolio_chat::api::{ApiConfig, ChatApiServer};
use portfolio_chat::config::AppConfig;
use portfolio_chat::context::{ContextRetriever, VectorIndexRetriever};
use portfolio_chat::llm::providers::{OllamaClient, OpenAiClient};
use portfolio_chat::llm::traits::{CompletionProvider, ModerationClient};
use portfolio_chat::pipeline::ChatPipeline;
use portfolio_chat::profile::ProfileStore;
use portfolio_chat::safety::{ModerationGate, ResponseFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // .env is optional; in production the deployment system sets the vars.
    if let Err(e) = dotenv() {
        eprintln!("Warning: could not load .env file: {}", e);
    }

    tracing_subscriber::fmt::init();

    info!("Starting portfolio chat server...");
    let config = AppConfig::from_env()?;

    // Log the provider wiring without exposing key material.
    info!(
        "Primary provider: openai ({} @ {})",
        config.openai.model, config.openai.base_url
    );
    if config.pipeline.fallback_enabled {
        info!(
            "Fallback provider: ollama ({} @ {})",
            config.ollama.model, config.ollama.base_url
        );
    }
    if config.context_index_url.is_some() {
        info!("Context retrieval enabled");
    }
    info!(
        "Moderation failure policy: {:?}",
        config.moderation_failure_policy
    );

    let openai = Arc::new(OpenAiClient::new(config.openai.clone()));
    let primary: Arc<dyn CompletionProvider> = openai.clone();
    let fallback: Arc<dyn CompletionProvider> = Arc::new(OllamaClient::new(config.ollama.clone()));
    let moderation_client: Arc<dyn ModerationClient> = openai;

    let moderation = ModerationGate::new(moderation_client, config.moderation_failure_policy);
    let filter = ResponseFilter::new(config.forbidden_terms.clone());

    let context: Option<Arc<dyn ContextRetriever>> = config.context_index_url.clone().map(|url| {
        Arc::new(VectorIndexRetriever::new(
            url,
            config.context_index_api_key.clone(),
            config.context_top_k,
            config.openai.timeout,
            primary.clone(),
        )) as Arc<dyn ContextRetriever>
    });

    let profiles = Arc::new(ProfileStore::new(
        config.profile_max_history,
        config.profile_max_skills,
    ));

    let pipeline = ChatPipeline::new(
        primary.clone(),
        Some(fallback),
        moderation,
        filter,
        context,
        profiles.clone(),
        config.pipeline.clone(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        primary,
        profiles,
    };

    ChatApiServer::new(
        ApiConfig {
            host: config.host.clone(),
            port: config.port,
            cors_enabled: config.cors_enabled,
        },
        state,
    )
    .run()
    .await?;

    Ok(())
}
