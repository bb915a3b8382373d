use crate::chat::Ingestor;
use crate::config::{Config, GithubConfig};
use crate::crawl::{CrawlReport, Crawler, DocumentFilter};
use crate::embeddings::OpenAiEmbedder;
use crate::error::{RagbotError, Result};
use crate::index::{PineconeIndex, VectorSink};
use crate::source::{parse_source_url, GithubClient};
use std::sync::Arc;
use std::time::Duration;

/// The full ingestion path: URL → crawl → embed → upsert.
///
/// One instance serves all upload commands; each run builds a fresh
/// [`GithubClient`] for the requested repository.
pub struct IngestPipeline {
    github: GithubConfig,
    token: Option<String>,
    filter: DocumentFilter,
    sink: VectorSink,
    index: Arc<PineconeIndex>,
}

impl IngestPipeline {
    pub fn new(
        config: &Config,
        token: Option<String>,
        embedder: Arc<OpenAiEmbedder>,
        index: Arc<PineconeIndex>,
    ) -> Self {
        Self {
            github: config.github.clone(),
            token,
            filter: DocumentFilter::new(&config.ingest.allowed_extensions),
            sink: VectorSink::new(embedder, Arc::clone(&index)),
            index,
        }
    }
}

impl Ingestor for IngestPipeline {
    async fn run(&self, source_url: &str) -> Result<CrawlReport> {
        let source = parse_source_url(source_url)?;
        log::info!(
            "Ingesting {} (starting path '{}')",
            source.api_url,
            source.starting_path
        );

        // Create-if-absent runs once per crawl invocation, never per file
        self.index.ensure_index().await?;

        let client = GithubClient::new(&self.github, self.token.clone(), source.api_url);
        let crawler = Crawler::new(client, self.filter.clone());

        let budget = Duration::from_secs(self.github.crawl_timeout_secs);
        match tokio::time::timeout(budget, crawler.crawl(&source.starting_path, &self.sink)).await
        {
            Ok(result) => result,
            Err(_) => Err(RagbotError::Timeout(format!(
                "Crawl of {} exceeded its {}s budget",
                source_url, self.github.crawl_timeout_secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ChatConfig, CompletionConfig, EmbeddingsConfig, IndexConfig, IngestConfig,
    };

    fn test_config() -> Config {
        Config {
            chat: ChatConfig {
                target_channel_id: "chan-42".to_string(),
                quota_limit: 5,
                quota_window_ms: 60_000,
            },
            github: GithubConfig {
                token_env: "GITHUB_TOKEN".to_string(),
                user_agent: "ragbot-test".to_string(),
                fetch_timeout_secs: 5,
                crawl_timeout_secs: 30,
            },
            ingest: IngestConfig::default(),
            index: IndexConfig {
                name: "test-index".to_string(),
                api_key_env: "PINECONE_API_KEY".to_string(),
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
                namespace: String::new(),
            },
            embeddings: EmbeddingsConfig {
                model: "text-embedding-3-small".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                batch_size: 100,
                dimensions: 1536,
                cache_capacity: 0,
            },
            completion: CompletionConfig {
                model: "gpt-4o-mini".to_string(),
                top_k: 5,
            },
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_any_network() {
        let config = test_config();
        let embedder = Arc::new(OpenAiEmbedder::new(
            &config.embeddings,
            "fake-key".to_string(),
            None,
        ));
        let index = Arc::new(PineconeIndex::new(
            &config.index,
            "fake-key".to_string(),
            config.embeddings.dimensions,
        ));
        let pipeline = IngestPipeline::new(&config, None, embedder, index);

        let err = pipeline
            .run("https://github.com/acme/repo/blob/main/readme.md")
            .await
            .unwrap_err();
        assert!(matches!(err, RagbotError::InvalidSourceUrl(_)));
    }
}
