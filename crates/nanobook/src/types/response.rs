//! Response bodies for the HTTP endpoints

use serde::{Deserialize, Serialize};

/// Status reported after a successful upload
pub const INGESTION_COMPLETE: &str = "ingestion_complete";

/// Body of a successful `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer (markdown)
    pub response: String,
    /// How the answer was produced
    pub metadata: ChatMetadata,
}

/// Pipeline facts reported alongside an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMetadata {
    /// Cross-encoder reranking was requested
    pub reranking_used: bool,
    /// At least one passage was retrieved
    pub context_retrieved: bool,
    /// The query was rewritten before retrieval (false when rewriting fell back)
    pub query_rewritten: bool,
}

/// Body of a successful `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable summary
    pub message: String,
    /// Number of chunks written to the vector store
    pub chunks_created: usize,
    /// Where the upload was saved
    pub file_path: String,
    /// Always [`INGESTION_COMPLETE`]
    #[serde(rename = "statusText")]
    pub status_text: String,
}

impl UploadResponse {
    /// Build the response for an ingested file
    pub fn ingested(filename: &str, chunks_created: usize, file_path: String) -> Self {
        Self {
            message: format!("File '{}' uploaded and ingested successfully.", filename),
            chunks_created,
            file_path,
            status_text: INGESTION_COMPLETE.to_string(),
        }
    }
}

/// Body of a successful `DELETE /reset`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Human-readable summary
    pub message: String,
}

impl Default for ResetResponse {
    fn default() -> Self {
        Self {
            message: "Document store has been reset successfully.".to_string(),
        }
    }
}

/// Error body returned by the handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Extra detail (only on `/chat` failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Error without details
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_field_names() {
        let response = UploadResponse::ingested("flu.txt", 3, "data_sources/flu.txt".to_string());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["message"], "File 'flu.txt' uploaded and ingested successfully.");
        assert_eq!(json["chunks_created"], 3);
        assert_eq!(json["statusText"], "ingestion_complete");
        assert!(json.get("status_text").is_none());
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("No selected file.")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "No selected file." }));
    }
}
