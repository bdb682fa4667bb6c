//! NanoBook server binary
//!
//! Run with: cargo run -p nanobook --bin nanobook-server -- --config nanobook.toml

use std::path::PathBuf;

use clap::Parser;
use nanobook::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nanobook-server", version, about = "NanoBook RAG backend HTTP server")]
struct Args {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, env = "NANOBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Return error details from /chat failures
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nanobook=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if args.debug {
        config.server.debug = true;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Qdrant: {} (collection '{}')",
        config.vector_db.url,
        config.vector_db.collection
    );
    tracing::info!("  - Embeddings: {} at {}", config.embeddings.model, config.embeddings.base_url);
    tracing::info!("  - Reranker: {} at {}", config.reranker.model, config.reranker.base_url);
    tracing::info!("  - Answer model: {}", config.llm.generate_model);
    tracing::info!("  - Rewrite model: {}", config.llm.rewrite_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Upload dir: {}", config.storage.upload_dir.display());

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /chat   - Ask questions about uploaded documents");
    println!("  POST   /upload - Upload and ingest a document");
    println!("  DELETE /reset  - Remove all documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
