//! nanobook: RAG backend for document question answering
//!
//! Uploaded documents are parsed, chunked, embedded with Ollama and stored in Qdrant.
//! Questions are rewritten into search queries, matched against the stored chunks,
//! reranked with a cross-encoder and answered by Gemini from the retrieved context.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::ChatRequest,
    response::ChatResponse,
};
