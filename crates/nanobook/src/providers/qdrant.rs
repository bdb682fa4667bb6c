//! Qdrant vector store over the REST API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Points sent per upsert request
const UPSERT_BATCH_SIZE: usize = 64;

/// Qdrant collection client
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: &'a [f32],
    payload: Value,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl ScoredPoint {
    fn into_result(self) -> VectorSearchResult {
        let payload = self.payload.unwrap_or(Value::Null);
        VectorSearchResult {
            content: payload["page_content"].as_str().unwrap_or_default().to_string(),
            source: payload["metadata"]["source"].as_str().map(str::to_string),
            score: self.score,
        }
    }
}

impl QdrantStore {
    /// Create a new Qdrant client for the configured collection
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            collection: config.collection.clone(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    /// Send a request and fail on non-success status
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("{} failed: {}", what, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::CollectionNotFound(self.collection.clone()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!("{} failed ({}): {}", what, status, body)));
        }

        Ok(response)
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn collection_exists(&self) -> Result<bool> {
        let request = self.client.get(self.collection_url(""));
        match self.send(request, "Collection lookup").await {
            Ok(_) => Ok(true),
            Err(Error::CollectionNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, dimensions: usize) -> Result<()> {
        let request = self.client.put(self.collection_url("")).json(&json!({
            "vectors": { "size": dimensions, "distance": "Cosine" }
        }));
        self.send(request, "Create collection").await?;

        tracing::info!(
            "Created Qdrant collection '{}' ({} dimensions)",
            self.collection,
            dimensions
        );
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if let Some(chunk) = chunks.iter().find(|c| c.embedding.is_empty()) {
            return Err(Error::vector_db(format!("Chunk {} has no embedding", chunk.id)));
        }

        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            let points: Vec<Point> = batch
                .iter()
                .map(|chunk| Point {
                    id: chunk.id.to_string(),
                    vector: &chunk.embedding,
                    payload: chunk.to_payload(),
                })
                .collect();

            let request = self
                .client
                .put(self.collection_url("/points?wait=true"))
                .json(&json!({ "points": points }));
            self.send(request, "Upsert points").await?;
        }

        tracing::debug!("Upserted {} points into '{}'", chunks.len(), self.collection);
        Ok(chunks.len())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let request = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&SearchRequest {
                vector,
                limit: top_k,
                with_payload: true,
            });

        let response: QdrantResponse<Vec<ScoredPoint>> = self
            .send(request, "Search")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse search response: {}", e)))?;

        Ok(response.result.into_iter().map(ScoredPoint::into_result).collect())
    }

    async fn delete_collection(&self) -> Result<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }

        let request = self.client.delete(self.collection_url(""));
        let response: QdrantResponse<bool> = self
            .send(request, "Delete collection")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse delete response: {}", e)))?;

        tracing::info!("Deleted Qdrant collection '{}'", self.collection);
        Ok(response.result)
    }

    async fn health_check(&self) -> Result<bool> {
        let request = self.with_auth(self.client.get(format!("{}/healthz", self.base_url)));
        match request.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_from_langchain_payload() {
        let point: ScoredPoint = serde_json::from_value(json!({
            "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
            "version": 3,
            "score": 0.87,
            "payload": {
                "page_content": "Influenza causes fever.",
                "metadata": { "source": "data_sources/flu.txt", "chunk_index": 0 }
            }
        }))
        .unwrap();

        let result = point.into_result();
        assert_eq!(result.content, "Influenza causes fever.");
        assert_eq!(result.source.as_deref(), Some("data_sources/flu.txt"));
        assert!((result.score - 0.87).abs() < f32::EPSILON);
    }

    #[test]
    fn test_search_result_without_source() {
        let point: ScoredPoint = serde_json::from_value(json!({
            "id": 7,
            "score": 0.5,
            "payload": { "page_content": "Orphan passage", "metadata": {} }
        }))
        .unwrap();
        assert_eq!(point.into_result().source, None);
    }

    #[test]
    fn test_collection_urls() {
        let store = QdrantStore::new(&VectorDbConfig {
            url: "http://qdrant:6333/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(store.collection(), "data_sources");
        assert_eq!(
            store.collection_url("/points/search"),
            "http://qdrant:6333/collections/data_sources/points/search"
        );
        assert!(store.api_key.is_none());
    }

    #[test]
    fn test_search_request_shape() {
        let vector = [0.1f32, 0.2];
        let json = serde_json::to_value(SearchRequest {
            vector: &vector,
            limit: 45,
            with_payload: true,
        })
        .unwrap();
        assert_eq!(json["limit"], 45);
        assert_eq!(json["with_payload"], true);
    }
}
