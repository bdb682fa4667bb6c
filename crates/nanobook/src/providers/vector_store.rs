//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearchResult {
    /// Passage text (`page_content`)
    pub content: String,
    /// Source path recorded at ingestion (`metadata.source`)
    pub source: Option<String>,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Trait for vector storage and similarity search over one collection
///
/// Implementations:
/// - `QdrantStore`: Qdrant REST API
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Whether the collection exists
    async fn collection_exists(&self) -> Result<bool>;

    /// Create the collection for vectors of the given size (cosine distance)
    async fn create_collection(&self, dimensions: usize) -> Result<()>;

    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if !self.collection_exists().await? {
            tracing::info!("Creating vector collection ({} dimensions)", dimensions);
            self.create_collection(dimensions).await?;
        }
        Ok(())
    }

    /// Insert chunks with their embeddings, returning how many were written
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Nearest neighbours of `vector`, best first
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Drop the collection; returns false when it did not exist
    async fn delete_collection(&self) -> Result<bool>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Name of the collection this store reads and writes
    fn collection(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
