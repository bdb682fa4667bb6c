//! Configuration for the RAG backend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Gemini configuration (rewriting and answers)
    pub llm: LlmConfig,
    /// Embedding server configuration
    pub embeddings: EmbeddingConfig,
    /// Cross-encoder configuration
    pub reranker: RerankerConfig,
    /// Qdrant configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Upload storage configuration
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("QDRANT_URL") {
            self.vector_db.url = url;
        }
        if let Some(key) = non_empty("QDRANT_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(url) = non_empty("OLLAMA_URL") {
            self.embeddings.base_url = url;
        }
        if let Some(url) = non_empty("RERANKER_URL") {
            self.reranker.base_url = url;
        }
        if let Some(dir) = non_empty("NANOBOOK_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(host) = non_empty("NANOBOOK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("NANOBOOK_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid NANOBOOK_PORT: {}", port),
            }
        }
    }

    /// Check that the settings needed to serve requests are present
    pub fn validate(&self) -> Result<()> {
        if self.vector_db.url.trim().is_empty() {
            return Err(Error::Config(
                "QDRANT_URL not set in environment variables.".to_string(),
            ));
        }
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::Config(
                "GEMINI_API_KEY not found in environment variables.".to_string(),
            ));
        }
        self.validate_chunking()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be greater than 0".to_string()));
        }
        if self.reranker.max_batch_size == 0 {
            return Err(Error::Config(
                "reranker.max_batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the chunking section (all that bulk ingest needs besides Qdrant)
    pub fn validate_chunking(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Include error details in 500 responses
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            debug: false,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key (GEMINI_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Model used for final answers
    pub generate_model: String,
    /// Model used for query rewriting
    pub rewrite_model: String,
    /// Sampling temperature for answers
    pub temperature: f32,
    /// Nucleus sampling for answers
    pub top_p: f32,
    /// Top-k sampling for answers
    pub top_k: u32,
    /// Answer length limit
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            generate_model: "gemini-2.5-flash".to_string(),
            rewrite_model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.3,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding server configuration (Ollama API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model (all-minilm is all-MiniLM-L6-v2)
    pub model: String,
    /// Concurrent embedding requests during ingestion
    pub concurrency: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            concurrency: 4,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Cross-encoder configuration (Text Embeddings Inference API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Reranker server base URL
    pub base_url: String,
    /// Model served by the reranker (informational, used in logs)
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Passages per `/rerank` call (TEI's `--max-client-batch-size`)
    pub max_batch_size: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            max_batch_size: 32,
        }
    }
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Qdrant URL (QDRANT_URL)
    pub url: String,
    /// Optional Qdrant API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Collection holding document chunks
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            collection: "data_sources".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages passed to the answer model
    pub top_k: usize,
    /// Candidate multiplier when reranking (initial search fetches top_k * this)
    pub rerank_candidate_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 15,
            rerank_candidate_factor: 3,
        }
    }
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where uploaded files are saved
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("data_sources"),
        }
    }
}
