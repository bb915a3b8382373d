use crate::config::EmbeddingsConfig;
use crate::embeddings::EmbeddingCache;
use crate::error::{RagbotError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Hard cap on inputs per request imposed by the API
const MAX_BATCH: usize = 2048;

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embeddings client
///
/// Batches inputs, retries retryable failures with exponential backoff, and
/// optionally consults an LRU cache for single-text (question) embeddings.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    batch_size: usize,
    cache: Option<Arc<EmbeddingCache>>,
}

impl OpenAiEmbedder {
    pub fn new(
        config: &EmbeddingsConfig,
        api_key: String,
        cache: Option<Arc<EmbeddingCache>>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model: config.model.clone(),
            batch_size: config.batch_size.min(MAX_BATCH),
            cache,
        }
    }

    /// Embed a batch of texts, splitting into API-sized requests.
    ///
    /// Returns one embedding per input, in input order.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.request_embeddings(batch.to_vec()).await?);
            // Breathe between full batches to stay under the rate limit
            if batch.len() == self.batch_size {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        Ok(all_embeddings)
    }

    /// Embed one question, consulting the cache first and retrying the API
    /// call up to `max_retries` times on 429/5xx.
    pub async fn embed_query(&self, text: &str, max_retries: usize) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text) {
                log::debug!("Embedding cache hit");
                return Ok(cached);
            }
        }

        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);
        let embedding = loop {
            match self.request_embeddings(vec![text.to_string()]).await {
                Ok(mut embeddings) if !embeddings.is_empty() => break embeddings.remove(0),
                Ok(_) => {
                    return Err(RagbotError::Embedding(
                        "Empty response from embeddings API".to_string(),
                    ))
                }
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    log::warn!("Retry {}/{} after error: {}", attempt + 1, max_retries, e);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(cache) = &self.cache {
            cache.put(text.to_string(), embedding.clone());
        }
        Ok(embedding)
    }

    async fn request_embeddings(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input,
        };

        let response = self
            .client
            .post(EMBEDDINGS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagbotError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RagbotError::Embedding(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagbotError::Embedding(format!("Failed to parse response: {}", e)))?;

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Rate limits and server-side errors are worth another try; everything else
/// (auth, malformed request) is not.
fn is_retryable(err: &RagbotError) -> bool {
    let msg = err.to_string();
    ["429", "500", "502", "503", "504"]
        .iter()
        .any(|code| msg.contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(batch_size: usize) -> EmbeddingsConfig {
        EmbeddingsConfig {
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size,
            dimensions: 1536,
            cache_capacity: 0,
        }
    }

    #[test]
    fn test_batch_size_is_capped() {
        let embedder = OpenAiEmbedder::new(&test_config(5000), "key".to_string(), None);
        assert_eq!(embedder.batch_size, MAX_BATCH);

        let embedder = OpenAiEmbedder::new(&test_config(100), "key".to_string(), None);
        assert_eq!(embedder.batch_size, 100);
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let embedder = OpenAiEmbedder::new(&test_config(100), "key".to_string(), None);
        // No inputs means no API call and no error, even with a bogus key
        let embeddings = embedder.embed_batch(Vec::new()).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_retryable_classification() {
        let rate_limited = RagbotError::Embedding("OpenAI API error 429: slow down".to_string());
        assert!(is_retryable(&rate_limited));

        let server_error = RagbotError::Embedding("OpenAI API error 503: unavailable".to_string());
        assert!(is_retryable(&server_error));

        let bad_auth = RagbotError::Embedding("OpenAI API error 401: bad key".to_string());
        assert!(!is_retryable(&bad_auth));
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small".to_string(),
            input: vec!["hello".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"][0], "hello");
    }
}
