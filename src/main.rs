use anyhow::{Context, Result};
use ragbot::answer::AnswerEngine;
use ragbot::chat::{run_gateway, Dispatcher, StdioNotifier};
use ragbot::embeddings::{EmbeddingCache, OpenAiEmbedder};
use ragbot::index::PineconeIndex;
use ragbot::pipeline::IngestPipeline;
use ragbot::quota::QuotaTracker;
use ragbot::Config;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Notices go to stdout for the gateway; logs go to stderr
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    log::info!("Starting ragbot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Target channel: {}", config.chat.target_channel_id);
    log::info!("Vector index: {}", config.index.name);
    log::info!("Embedding model: {}", config.embeddings.model);

    let openai_key = std::env::var(&config.embeddings.api_key_env)
        .with_context(|| format!("Environment variable {} not set", config.embeddings.api_key_env))?;
    let pinecone_key = std::env::var(&config.index.api_key_env)
        .with_context(|| format!("Environment variable {} not set", config.index.api_key_env))?;

    // Question-embedding cache is optional (cache_capacity = 0 disables it)
    let cache = if config.embeddings.cache_capacity > 0 {
        Some(Arc::new(EmbeddingCache::new(config.embeddings.cache_capacity)))
    } else {
        None
    };
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embeddings, openai_key.clone(), cache));

    let index = Arc::new(PineconeIndex::new(
        &config.index,
        pinecone_key,
        config.embeddings.dimensions,
    ));

    // Best effort at startup; each upload command retries this before
    // crawling, so a transient failure here doesn't block the bot.
    if let Err(e) = index.ensure_index().await {
        log::error!("Failed to set up vector index: {}", e);
    }

    let quota = QuotaTracker::new(config.chat.quota_limit, config.chat.quota_window_ms);
    let pipeline = IngestPipeline::new(
        &config,
        config.github_token(),
        Arc::clone(&embedder),
        Arc::clone(&index),
    );
    let engine = AnswerEngine::new(&config.completion, openai_key, embedder, index);

    let dispatcher = Arc::new(Dispatcher::new(
        config.chat.target_channel_id.clone(),
        quota,
        StdioNotifier::new(),
        pipeline,
        engine,
    ));

    log::info!("Listening for chat events on stdin");
    run_gateway(dispatcher).await?;

    Ok(())
}
