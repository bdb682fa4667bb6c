//! Document ingestion pipeline with multi-format parsing

mod chunker;
mod converter;
mod indexer;
mod parser;
mod processor;

pub use chunker::{TextChunker, TextSpan};
pub use converter::LegacyConverter;
pub use indexer::ChunkIndexer;
pub use parser::{FileParser, PageContent, ParsedDocument};
pub use processor::IngestPipeline;
