//! In-process fakes of the external services for unit and router tests

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::providers::{
    EmbeddingProvider, GenerationRequest, LlmProvider, Reranker, VectorSearchResult,
    VectorStoreProvider,
};
use crate::types::Chunk;

/// Search result with a fixed score
pub fn passage(content: &str, source: Option<&str>) -> VectorSearchResult {
    VectorSearchResult {
        content: content.to_string(),
        source: source.map(str::to_string),
        score: 1.0,
    }
}

/// LLM that replays queued replies and records every request
#[derive(Default)]
pub struct FakeLlm {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
    fail: bool,
}

impl FakeLlm {
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(Error::llm("model unavailable"));
        }
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| Error::llm("no reply queued"))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Embeds text as `[chars, 1.0, 0.5]`
#[derive(Default)]
pub struct FakeEmbedder {
    fail: bool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("embedding service down"));
        }
        Ok(vec![text.chars().count() as f32, 1.0, 0.5])
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Scores passages by their length in characters
#[derive(Default)]
pub struct FakeReranker {
    fail: bool,
    last_query: Mutex<Option<String>>,
}

impl FakeReranker {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().clone()
    }
}

#[async_trait]
impl Reranker for FakeReranker {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        *self.last_query.lock() = Some(query.to_string());
        if self.fail {
            return Err(Error::reranker("reranker down"));
        }
        Ok(passages.iter().map(|p| p.chars().count() as f32).collect())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Vector store that returns its passages in insertion order
///
/// `Default` has no collection.
#[derive(Default)]
pub struct FakeVectorStore {
    passages: Mutex<Option<Vec<VectorSearchResult>>>,
    upserted: Mutex<Vec<Chunk>>,
    created_dimensions: Mutex<Option<usize>>,
    last_limit: Mutex<Option<usize>>,
    unhealthy: bool,
}

impl FakeVectorStore {
    pub fn with_passages(passages: Vec<VectorSearchResult>) -> Self {
        Self {
            passages: Mutex::new(Some(passages)),
            ..Default::default()
        }
    }

    /// Store that is down: health checks report false and deletes fail
    pub fn unhealthy() -> Self {
        Self {
            unhealthy: true,
            ..Default::default()
        }
    }

    pub fn has_collection(&self) -> bool {
        self.passages.lock().is_some()
    }

    pub fn created_dimensions(&self) -> Option<usize> {
        *self.created_dimensions.lock()
    }

    pub fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock()
    }

    pub fn upserted(&self) -> Vec<Chunk> {
        self.upserted.lock().clone()
    }
}

#[async_trait]
impl VectorStoreProvider for FakeVectorStore {
    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.has_collection())
    }

    async fn create_collection(&self, dimensions: usize) -> Result<()> {
        *self.created_dimensions.lock() = Some(dimensions);
        self.passages.lock().get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut passages = self.passages.lock();
        let stored = passages
            .as_mut()
            .ok_or_else(|| Error::CollectionNotFound(self.collection().to_string()))?;

        for chunk in chunks {
            stored.push(passage(&chunk.content, Some(&chunk.source.source_path)));
        }
        self.upserted.lock().extend_from_slice(chunks);
        Ok(chunks.len())
    }

    async fn search(&self, _vector: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        *self.last_limit.lock() = Some(top_k);
        let passages = self.passages.lock();
        let stored = passages
            .as_ref()
            .ok_or_else(|| Error::CollectionNotFound(self.collection().to_string()))?;
        Ok(stored.iter().take(top_k).cloned().collect())
    }

    async fn delete_collection(&self) -> Result<bool> {
        if self.unhealthy {
            return Err(Error::vector_db("connection refused"));
        }
        Ok(self.passages.lock().take().is_some())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.unhealthy)
    }

    fn collection(&self) -> &str {
        "data_sources"
    }

    fn name(&self) -> &str {
        "fake"
    }
}
