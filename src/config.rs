use anyhow::{Context, Result};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chat: ChatConfig,
    pub github: GithubConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub index: IndexConfig,
    pub embeddings: EmbeddingsConfig,
    pub completion: CompletionConfig,
}

/// Chat-platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Channel the bot listens on; events from any other channel are ignored.
    pub target_channel_id: String,
    #[serde(default = "default_quota_limit")]
    pub quota_limit: u32,
    #[serde(default = "default_quota_window_ms")]
    pub quota_window_ms: u64,
}

/// GitHub contents API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout for listing and content fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Budget for one whole crawl, start to finish.
    #[serde(default = "default_crawl_timeout_secs")]
    pub crawl_timeout_secs: u64,
}

/// Ingestion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Pinecone index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    #[serde(default = "default_index_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_index_cloud")]
    pub cloud: String,
    #[serde(default = "default_index_region")]
    pub region: String,
    #[serde(default)]
    pub namespace: String,
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
    pub batch_size: usize,
    pub dimensions: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Answer-generation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub model: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_quota_limit() -> u32 {
    5
}

fn default_quota_window_ms() -> u64 {
    60_000
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_user_agent() -> String {
    "ragbot".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_crawl_timeout_secs() -> u64 {
    600
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string(), "mdx".to_string()]
}

fn default_index_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

fn default_index_cloud() -> String {
    "aws".to_string()
}

fn default_index_region() -> String {
    "us-east-1".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_top_k() -> usize {
    5
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RAGBOT_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RAGBOT_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.chat.target_channel_id.is_empty() {
            anyhow::bail!("chat.target_channel_id must not be empty");
        }

        if self.chat.quota_limit == 0 {
            anyhow::bail!("chat.quota_limit must be greater than 0");
        }

        if self.chat.quota_window_ms == 0 {
            anyhow::bail!("chat.quota_window_ms must be greater than 0");
        }

        if self.ingest.allowed_extensions.is_empty() {
            anyhow::bail!("ingest.allowed_extensions must list at least one extension");
        }

        if self.index.name.is_empty() {
            anyhow::bail!("index.name must not be empty");
        }

        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }

        if self.embeddings.dimensions == 0 {
            anyhow::bail!("embeddings.dimensions must be greater than 0");
        }

        if self.completion.top_k == 0 {
            anyhow::bail!("completion.top_k must be greater than 0");
        }

        // Required API keys. The GitHub token is optional (unauthenticated
        // requests work against public repos, with lower rate limits).
        std::env::var(&self.embeddings.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your OpenAI API key.",
                self.embeddings.api_key_env
            )
        })?;

        std::env::var(&self.index.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your Pinecone API key.",
                self.index.api_key_env
            )
        })?;

        Ok(())
    }

    /// Resolved GitHub token, if the configured env var is set
    pub fn github_token(&self) -> Option<String> {
        std::env::var(&self.github.token_env).ok()
    }
}
