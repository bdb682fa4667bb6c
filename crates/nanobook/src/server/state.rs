//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::AnswerGenerator;
use crate::ingestion::{ChunkIndexer, IngestPipeline};
use crate::providers::{
    CrossEncoderReranker, DocumentStoreProvider, EmbeddingProvider, GeminiClient, LlmProvider,
    LocalDocumentStore, OllamaEmbedder, QdrantStore, Reranker, VectorStoreProvider,
};
use crate::retrieval::{QueryRewriter, Retriever};

/// External services the server talks to
pub struct Providers {
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub reranker: Arc<dyn Reranker>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub document_store: Arc<dyn DocumentStoreProvider>,
}

impl Providers {
    /// Build the HTTP clients described by `config`
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            llm: Arc::new(GeminiClient::new(&config.llm)?),
            embedder: Arc::new(OllamaEmbedder::new(&config.embeddings)?),
            reranker: Arc::new(CrossEncoderReranker::new(&config.reranker)?),
            vector_store: Arc::new(QdrantStore::new(&config.vector_db)?),
            document_store: Arc::new(LocalDocumentStore::new(config.storage.upload_dir.clone())),
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// File bytes to chunks
    pipeline: IngestPipeline,
    /// Chunks to vectors
    indexer: ChunkIndexer,
    /// Question to passages
    retriever: Retriever,
    /// Passages to answer
    generator: AnswerGenerator,
    vector_store: Arc<dyn VectorStoreProvider>,
    document_store: Arc<dyn DocumentStoreProvider>,
}

impl AppState {
    /// Create application state with clients for the configured services
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");
        let providers = Providers::from_config(&config)?;

        tracing::info!("  - LLM: {} ({})", providers.llm.name(), config.llm.generate_model);
        tracing::info!(
            "  - Embeddings: {} ({})",
            providers.embedder.name(),
            config.embeddings.model
        );
        tracing::info!("  - Reranker: {} ({})", providers.reranker.name(), config.reranker.model);
        tracing::info!(
            "  - Vector store: {} (collection '{}')",
            providers.vector_store.name(),
            providers.vector_store.collection()
        );

        Ok(Self::with_providers(config, providers))
    }

    /// Create application state around existing providers
    pub fn with_providers(config: RagConfig, providers: Providers) -> Self {
        let pipeline =
            IngestPipeline::new(config.chunking.chunk_size, config.chunking.chunk_overlap);

        let indexer = ChunkIndexer::new(
            Arc::clone(&providers.embedder),
            Arc::clone(&providers.vector_store),
            config.embeddings.concurrency,
        );

        let retriever = Retriever::new(
            Arc::clone(&providers.embedder),
            Arc::clone(&providers.vector_store),
            Arc::clone(&providers.reranker),
            QueryRewriter::new(Arc::clone(&providers.llm), config.llm.rewrite_model.clone()),
        )
        .with_candidate_factor(config.retrieval.rerank_candidate_factor);

        let generator = AnswerGenerator::new(Arc::clone(&providers.llm), &config.llm);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                indexer,
                retriever,
                generator,
                vector_store: providers.vector_store,
                document_store: providers.document_store,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn indexer(&self) -> &ChunkIndexer {
        &self.inner.indexer
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.inner.generator
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.vector_store
    }

    pub fn document_store(&self) -> &Arc<dyn DocumentStoreProvider> {
        &self.inner.document_store
    }

    /// Ready when the vector store answers its health check
    pub async fn is_ready(&self) -> bool {
        match self.inner.vector_store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Vector store health check failed: {}", e);
                false
            }
        }
    }
}
