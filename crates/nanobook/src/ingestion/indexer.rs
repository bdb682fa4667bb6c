//! Embedding chunks and writing them to the vector store

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::Chunk;

/// Embeds chunks and stores them, creating the collection on first use
pub struct ChunkIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    concurrency: usize,
}

impl ChunkIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            concurrency: concurrency.max(1),
        }
    }

    /// Embed and store `chunks`, returning how many were written
    pub async fn index(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts, self.concurrency).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        // The collection is sized from what the model actually returns
        let dimensions = embeddings[0].len();
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(Error::embedding(format!(
                "Embedding {} has {} dimensions, expected {}",
                bad,
                embeddings[bad].len(),
                dimensions
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.ensure_collection(dimensions).await?;
        let written = self.vector_store.upsert(&chunks).await?;

        tracing::info!(
            "Indexed {} chunks into {} '{}'",
            written,
            self.vector_store.name(),
            self.vector_store.collection()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::IngestPipeline;
    use crate::test_support::{FakeEmbedder, FakeVectorStore};

    async fn chunks() -> Vec<Chunk> {
        let (_, chunks) = IngestPipeline::new(30, 5)
            .ingest(
                "flu.txt",
                "data_sources/flu.txt",
                b"Influenza spreads quickly.\n\nFever and cough are common.".to_vec(),
            )
            .await
            .unwrap();
        chunks
    }

    #[tokio::test]
    async fn test_index_creates_collection() {
        let store = Arc::new(FakeVectorStore::default());
        let indexer = ChunkIndexer::new(Arc::new(FakeEmbedder::default()), store.clone(), 4);

        let chunks = chunks().await;
        let count = chunks.len();
        assert_eq!(indexer.index(chunks).await.unwrap(), count);

        assert_eq!(store.created_dimensions(), Some(3));
        let stored = store.upserted();
        assert_eq!(stored.len(), count);
        // Order is preserved and every chunk carries its own embedding
        for chunk in &stored {
            assert_eq!(chunk.embedding[0], chunk.content.chars().count() as f32);
        }
    }

    #[tokio::test]
    async fn test_existing_collection_reused() {
        let store = Arc::new(FakeVectorStore::with_passages(Vec::new()));
        let indexer = ChunkIndexer::new(Arc::new(FakeEmbedder::default()), store.clone(), 1);

        indexer.index(chunks().await).await.unwrap();
        assert_eq!(store.created_dimensions(), None);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let store = Arc::new(FakeVectorStore::default());
        let indexer = ChunkIndexer::new(Arc::new(FakeEmbedder::failing()), store.clone(), 2);

        assert!(matches!(indexer.index(chunks().await).await, Err(Error::Embedding(_))));
        assert!(!store.has_collection());
        assert!(store.upserted().is_empty());
    }
}
