//! Bulk ingestion binary
//!
//! Ingests every supported file under a directory into the vector store.
//! Run with: cargo run -p nanobook --bin nanobook-ingest -- --dir data_sources

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use nanobook::config::RagConfig;
use nanobook::ingestion::{ChunkIndexer, IngestPipeline};
use nanobook::providers::{OllamaEmbedder, QdrantStore};
use nanobook::types::is_allowed_upload;

#[derive(Parser)]
#[command(name = "nanobook-ingest", version, about = "Ingest a directory of documents into Qdrant")]
struct Args {
    /// Directory to ingest
    #[arg(short, long, default_value = "data_sources")]
    dir: PathBuf,

    /// TOML configuration file (environment variables override it)
    #[arg(short, long, env = "NANOBOOK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nanobook=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load(args.config.as_deref())?;
    anyhow::ensure!(
        !config.vector_db.url.trim().is_empty(),
        "QDRANT_URL not set in environment variables."
    );
    config.validate_chunking()?;

    let files: Vec<PathBuf> = WalkDir::new(&args.dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_allowed_upload(&path.to_string_lossy()))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No documents found in {}", args.dir.display());
    }

    let pipeline = IngestPipeline::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
    let indexer = ChunkIndexer::new(
        Arc::new(OllamaEmbedder::new(&config.embeddings)?),
        Arc::new(QdrantStore::new(&config.vector_db)?),
        config.embeddings.concurrency,
    );

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut documents = 0usize;
    let mut chunks_created = 0usize;
    let mut failures = Vec::new();

    for path in &files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.set_message(filename.clone());

        let result = async {
            let data = tokio::fs::read(path).await?;
            let (_, chunks) = pipeline
                .ingest(&filename, &path.to_string_lossy(), data)
                .await?;
            indexer.index(chunks).await
        }
        .await;

        match result {
            Ok(count) => {
                documents += 1;
                chunks_created += count;
            }
            Err(e) => failures.push((path.display().to_string(), e.to_string())),
        }
        progress.inc(1);
    }

    progress.finish_with_message("done");

    println!("Loaded {} documents", documents);
    println!("Created {} chunks", chunks_created);
    for (path, error) in &failures {
        eprintln!("  failed: {} ({})", path, error);
    }

    anyhow::ensure!(documents > 0, "No documents could be ingested");
    Ok(())
}
