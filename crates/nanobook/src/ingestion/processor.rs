//! File to chunks: conversion, parsing and splitting

use super::chunker::TextChunker;
use super::converter::LegacyConverter;
use super::parser::FileParser;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document, FileType};

/// Turns raw file bytes into a document record and its text chunks
pub struct IngestPipeline {
    chunker: TextChunker,
    converter: LegacyConverter,
}

impl IngestPipeline {
    /// Create a pipeline with the given chunking parameters
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunker: TextChunker::new(chunk_size, chunk_overlap),
            converter: LegacyConverter::default(),
        }
    }

    /// Use a different legacy format converter
    pub fn with_converter(mut self, converter: LegacyConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Parse and chunk a file
    ///
    /// `source_path` is recorded as the chunk source. Chunks come back without embeddings.
    pub async fn ingest(
        &self,
        filename: &str,
        source_path: &str,
        data: Vec<u8>,
    ) -> Result<(Document, Vec<Chunk>)> {
        let file_type = FileType::from_filename(filename);
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(filename.to_string()));
        }
        let file_size = data.len() as u64;

        let (parse_name, parse_data) = if file_type.requires_conversion() {
            tracing::info!("Converting legacy format: {}", filename);
            self.converter.convert(filename, &data).await?
        } else {
            (filename.to_string(), data)
        };

        // Parsers are synchronous and can be slow on large PDFs
        let parsed =
            tokio::task::spawn_blocking(move || FileParser::parse(&parse_name, &parse_data))
                .await
                .map_err(|e| Error::internal(format!("Parser task failed: {}", e)))??;

        let mut document = Document::new(
            filename.to_string(),
            source_path.to_string(),
            file_type,
            parsed.content_hash.clone(),
            file_size,
        );
        document.total_pages = parsed.total_pages;

        let chunks = self.chunker.chunk_document(&document, &parsed);
        document.total_chunks = chunks.len() as u32;

        tracing::info!(
            "Parsed {} ({} chars, {} chunks)",
            filename,
            parsed.content.chars().count(),
            chunks.len()
        );

        Ok((document, chunks))
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(500, 100)
    }
}
