//! Provider abstractions for the external services
//!
//! Each service sits behind a trait so the server can be wired with real clients
//! or with in-process fakes.

pub mod document_store;
pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod qdrant;
pub mod reranker;
pub mod retry;
pub mod vector_store;

pub use document_store::{sanitize_filename, DocumentStoreProvider, StoredFile};
pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::{Content, GenerationParams, GenerationRequest, LlmProvider, Part};
pub use local::LocalDocumentStore;
pub use ollama::OllamaEmbedder;
pub use qdrant::QdrantStore;
pub use reranker::{CrossEncoderReranker, Reranker};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
