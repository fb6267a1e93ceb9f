//! Document Q&A server binary
//!
//! Run with: cargo run --bin docqa-server

use std::path::PathBuf;

use docqa_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up OPENAI_API_KEY and friends from a local .env, if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from DOCQA_CONFIG if set, otherwise defaults + env
    let config = match std::env::var("DOCQA_CONFIG") {
        Ok(path) => RagConfig::load(&PathBuf::from(path))?,
        Err(_) => RagConfig::from_env(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Provider: {:?}", config.provider);
    tracing::info!("  - Embedding dimensions: {}", config.dimensions());
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - Data dir: {}", config.storage.data_dir.display());

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest    - Upload documents");
    println!("  POST /api/query     - Ask questions");
    println!("  GET  /api/documents - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
