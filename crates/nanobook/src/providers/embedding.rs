//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (all-minilm, nomic-embed-text, ...)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, keeping input order
    ///
    /// Default implementation runs up to `concurrency` `embed` calls at once.
    async fn embed_batch(&self, texts: &[String], concurrency: usize) -> Result<Vec<Vec<f32>>> {
        // Futures are built up front so the stream does not borrow through a closure
        let calls: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        stream::iter(calls)
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
