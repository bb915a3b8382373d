use anyhow::{Context, Result};
use clap::Parser;
use ragbot::chat::Ingestor;
use ragbot::embeddings::OpenAiEmbedder;
use ragbot::index::PineconeIndex;
use ragbot::pipeline::IngestPipeline;
use ragbot::Config;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Crawl a GitHub docs folder and ingest it into the vector index")]
struct Args {
    /// GitHub tree URL: https://github.com/<owner>/<repo>/tree/<branch>/<path>
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Starting ragbot ingestion");

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Vector index: {}", config.index.name);

    let openai_key = std::env::var(&config.embeddings.api_key_env)
        .with_context(|| format!("Environment variable {} not set", config.embeddings.api_key_env))?;
    let pinecone_key = std::env::var(&config.index.api_key_env)
        .with_context(|| format!("Environment variable {} not set", config.index.api_key_env))?;

    // No query cache here; this binary only embeds documents
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embeddings, openai_key, None));
    let index = Arc::new(PineconeIndex::new(
        &config.index,
        pinecone_key,
        config.embeddings.dimensions,
    ));

    let pipeline = IngestPipeline::new(&config, config.github_token(), embedder, index);

    let start = Instant::now();
    let report = pipeline.run(&args.url).await?;

    log::info!(
        "Done in {:.1}s: {} dir(s) listed, {} ingested, {} skipped, {} failed",
        start.elapsed().as_secs_f64(),
        report.listed_dirs,
        report.ingested,
        report.skipped,
        report.failed
    );

    Ok(())
}
