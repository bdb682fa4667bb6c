//! Document and chunk types

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Upload extensions accepted by `/upload`, in the order they are reported to clients
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".txt", ".pdf", ".doc", ".docx", ".md", ".html", ".htm", ".csv", ".xlsx", ".xls", ".pptx",
    ".ppt",
];

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Old Microsoft Word document (.doc) - requires LibreOffice
    Doc,
    /// HTML document
    Html,
    /// CSV file
    Csv,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Old Excel spreadsheet (.xls)
    Xls,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Old Microsoft PowerPoint (.ppt) - requires LibreOffice
    Ppt,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension (without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" => Self::Txt,
            "md" => Self::Markdown,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "html" | "htm" => Self::Html,
            "csv" => Self::Csv,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "pptx" => Self::Pptx,
            "ppt" => Self::Ppt,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Check if this format must be converted with LibreOffice before parsing
    pub fn requires_conversion(&self) -> bool {
        matches!(self, Self::Doc | Self::Ppt)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Doc => "Word Document (.doc)",
            Self::Html => "HTML",
            Self::Csv => "CSV",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Xls => "Excel Spreadsheet (.xls)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Ppt => "PowerPoint (.ppt)",
            Self::Unknown => "Unknown",
        }
    }
}

/// Check an upload filename against [`ALLOWED_EXTENSIONS`]
pub fn is_allowed_upload(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let dotted = format!(".{}", ext.to_lowercase());
            ALLOWED_EXTENSIONS.contains(&dotted.as_str())
        })
        .unwrap_or(false)
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename as uploaded
    pub filename: String,
    /// Where the file was saved (reported as `source` in retrieved context)
    pub source_path: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Total number of pages, slides or sheets (if applicable)
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(
        filename: String,
        source_path: String,
        file_type: FileType,
        content_hash: String,
        file_size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            source_path,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information for a chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Filename as uploaded
    pub filename: String,
    /// Saved path of the source file
    pub source_path: String,
    /// File type
    pub file_type: FileType,
    /// Page, slide or sheet number (1-indexed)
    pub page_number: Option<u32>,
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID (also the vector point ID)
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Character span in the text the chunk was cut from
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }

    /// Vector point payload, in the `page_content` + `metadata` layout used by LangChain
    pub fn to_payload(&self) -> serde_json::Value {
        let mut metadata = serde_json::json!({
            "source": self.source.source_path,
            "filename": self.source.filename,
            "file_type": self.source.file_type,
            "document_id": self.document_id.to_string(),
            "chunk_index": self.chunk_index,
            "char_start": self.char_start,
            "char_end": self.char_end,
        });

        if let Some(page) = self.source.page_number {
            metadata["page"] = serde_json::json!(page);
        }

        serde_json::json!({
            "page_content": self.content,
            "metadata": metadata,
        })
    }
}
