//! Ollama embedding provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::EmbeddingProvider;
use super::retry::{retry_request, Failure};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Ollama embedding provider (`/api/embeddings`)
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.concurrency.max(1))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Model used for embeddings
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        retry_request("Embedding request", self.max_retries, || {
            let request = self.client.post(&url).json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            });

            async move {
                let response = request.send().await.map_err(|e| {
                    let error = Error::embedding(format!("Embedding request failed: {}", e));
                    Failure::from_send(&e, error)
                })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Failure::from_status(
                        status,
                        Error::embedding(format!("HTTP {}: {}", status, body)),
                    ));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                if embed_response.embedding.is_empty() {
                    return Err(Error::embedding("Ollama returned an empty embedding").into());
                }

                Ok(embed_response.embedding)
            }
        })
        .await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
