//! Cross-encoder reranking

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::retry::{retry_request, Failure};
use crate::config::RerankerConfig;
use crate::error::{Error, Result};

/// Trait for scoring `(query, passage)` pairs
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Relevance score for each passage, aligned with `passages`
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Cross-encoder served by text-embeddings-inference (`POST /rerank`)
pub struct CrossEncoderReranker {
    client: Client,
    base_url: String,
    model: String,
    max_retries: u32,
    max_batch_size: usize,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

impl CrossEncoderReranker {
    /// Create a new reranker client
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            max_batch_size: config.max_batch_size.max(1),
        })
    }

    /// One `/rerank` call; indices in the result are relative to `texts`
    async fn rerank_batch(
        &self,
        url: &str,
        query: &str,
        texts: &[String],
    ) -> Result<Vec<RerankScore>> {
        retry_request("Rerank request", self.max_retries, || {
            let request = self.client.post(url).json(&RerankRequest {
                query,
                texts,
                raw_scores: true,
            });

            async move {
                let response = request.send().await.map_err(|e| {
                    Failure::from_send(&e, Error::reranker(format!("Rerank request failed: {}", e)))
                })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Failure::from_status(
                        status,
                        Error::reranker(format!("HTTP {}: {}", status, body)),
                    ));
                }

                let scores: Vec<RerankScore> = response.json().await.map_err(|e| {
                    Error::reranker(format!("Failed to parse rerank response: {}", e))
                })?;
                Ok(scores)
            }
        })
        .await
    }
}

/// Score `passages` in slices of at most `batch_size`, then align to passage order
async fn score_in_batches<'a, F, Fut>(
    passages: &'a [String],
    batch_size: usize,
    mut call: F,
) -> Result<Vec<f32>>
where
    F: FnMut(&'a [String]) -> Fut,
    Fut: Future<Output = Result<Vec<RerankScore>>>,
{
    let batch_size = batch_size.max(1);
    let mut scores = Vec::with_capacity(passages.len());

    for (batch_number, batch) in passages.chunks(batch_size).enumerate() {
        let offset = batch_number * batch_size;
        for RerankScore { index, score } in call(batch).await? {
            if index >= batch.len() {
                return Err(Error::reranker(format!("Score index {} out of range", index)));
            }
            scores.push(RerankScore {
                index: offset + index,
                score,
            });
        }
    }

    align_scores(scores, passages.len())
}

/// Put scores back into passage order
fn align_scores(scores: Vec<RerankScore>, len: usize) -> Result<Vec<f32>> {
    let mut aligned = vec![None; len];
    for RerankScore { index, score } in scores {
        let slot = aligned
            .get_mut(index)
            .ok_or_else(|| Error::reranker(format!("Score index {} out of range", index)))?;
        *slot = Some(score);
    }

    aligned
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| Error::reranker(format!("No score for passage {}", i))))
        .collect()
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let url = url.as_str();
        tracing::debug!(
            "Reranking {} passages with {} (batches of {})",
            passages.len(),
            self.model,
            self.max_batch_size
        );

        score_in_batches(passages, self.max_batch_size, move |batch| {
            self.rerank_batch(url, query, batch)
        })
        .await
    }

    fn name(&self) -> &str {
        "cross-encoder"
    }
}
