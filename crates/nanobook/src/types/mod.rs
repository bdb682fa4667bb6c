//! Core types for the RAG backend

pub mod document;
pub mod query;
pub mod response;

pub use document::{is_allowed_upload, Chunk, ChunkSource, Document, FileType, ALLOWED_EXTENSIONS};
pub use query::{ChatRequest, HistoryMessage};
pub use response::{ChatMetadata, ChatResponse, ErrorResponse, ResetResponse, UploadResponse};
