//! Best-effort knowledge retrieval
//!
//! Retrieves portfolio snippets relevant to the user's message so the
//! provider can ground its reply. The pipeline treats this as an opaque
//! collaborator: any failure here degrades to a no-context request and is
//! never surfaced to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::traits::CompletionProvider;
use crate::llm::{ProviderError, ProviderResult};

/// One retrieved snippet, ranked by similarity score.
#[derive(Debug, Clone)]
pub struct ContextSnippet {
    pub text: String,
    pub score: f32,
}

/// Opaque ranked-snippet retrieval.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> ProviderResult<Vec<ContextSnippet>>;
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    text: Option<String>,
}

/// Retriever backed by a hosted vector index: embeds the query through the
/// provider, then runs a top-k similarity query.
pub struct VectorIndexRetriever {
    http: Client,
    base_url: String,
    api_key: String,
    top_k: usize,
    timeout: Duration,
    embedder: Arc<dyn CompletionProvider>,
}

impl VectorIndexRetriever {
    pub fn new(
        base_url: String,
        api_key: String,
        top_k: usize,
        timeout: Duration,
        embedder: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
            top_k,
            timeout,
            embedder,
        }
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| ProviderError::AuthenticationFailed(format!("invalid index key: {}", e)))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ContextRetriever for VectorIndexRetriever {
    async fn retrieve(&self, query: &str) -> ProviderResult<Vec<ContextSnippet>> {
        let vector = self.embedder.embed(query).await?;

        let url = format!("{}/query", self.base_url);
        let request = QueryRequest {
            vector,
            top_k: self.top_k,
            include_metadata: true,
        };

        let response = self
            .http
            .post(&url)
            .headers(self.build_headers()?)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::Network(format!(
                "vector index query failed ({}): {}",
                status, body
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        let snippets: Vec<ContextSnippet> = body
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata
                    .and_then(|metadata| metadata.text)
                    .map(|text| ContextSnippet {
                        text,
                        score: m.score,
                    })
            })
            .collect();

        debug!("context retrieval returned {} snippets", snippets.len());
        Ok(snippets)
    }
}

/// Render retrieved snippets as a system message for the provider.
pub fn format_context(snippets: &[ContextSnippet]) -> String {
    let mut prompt = String::from(
        "Use the following portfolio context when it is relevant to the question:\n",
    );
    for snippet in snippets {
        prompt.push_str("- ");
        prompt.push_str(&snippet.text);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_maps_to_snippets() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"matches":[
                {"score":0.91,"metadata":{"text":"Built a Rust chat backend"}},
                {"score":0.44,"metadata":{}},
                {"score":0.40}
            ]}"#,
        )
        .unwrap();

        let snippets: Vec<ContextSnippet> = body
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata
                    .and_then(|metadata| metadata.text)
                    .map(|text| ContextSnippet {
                        text,
                        score: m.score,
                    })
            })
            .collect();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "Built a Rust chat backend");
    }

    #[test]
    fn formatted_context_lists_each_snippet() {
        let snippets = vec![
            ContextSnippet {
                text: "Ships Rust services".to_string(),
                score: 0.9,
            },
            ContextSnippet {
                text: "Maintains an open-source CLI".to_string(),
                score: 0.8,
            },
        ];
        let prompt = format_context(&snippets);
        assert!(prompt.contains("- Ships Rust services\n"));
        assert!(prompt.contains("- Maintains an open-source CLI\n"));
    }
}
