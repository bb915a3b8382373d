use crate::config::IndexConfig;
use crate::error::{RagbotError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Metadata stored alongside every vector
///
/// `text` carries the segment content so the answer path can hand retrieved
/// chunks straight to the language model without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_path: String,
    pub text: String,
    pub content_sha256: String,
    pub ingested_at: String,
}

/// One vector ready for upsert
#[derive(Debug, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One retrieved chunk with its similarity score
#[derive(Debug, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: usize,
}

#[derive(Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredChunk>,
}

/// Pinecone index client: ensure-exists, upsert, query.
///
/// The data-plane host is resolved by [`ensure_index`](Self::ensure_index)
/// and cached for the life of the process.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    name: String,
    namespace: String,
    cloud: String,
    region: String,
    dimensions: usize,
    host: Mutex<Option<String>>,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig, api_key: String, dimensions: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            name: config.name.clone(),
            namespace: config.namespace.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            dimensions,
            host: Mutex::new(None),
        }
    }

    /// Make sure the index exists, creating it if absent, and resolve its
    /// data-plane host. Idempotent; a no-op once the host is known.
    pub async fn ensure_index(&self) -> Result<()> {
        if self.host.lock().unwrap().is_some() {
            return Ok(());
        }

        let describe_url = format!("{}/indexes/{}", CONTROL_PLANE_URL, self.name);
        let response = self
            .client
            .get(&describe_url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RagbotError::Index(format!("Describe request failed: {}", e)))?;

        let status = response.status();
        let host = if status.is_success() {
            let described: DescribeIndexResponse = response
                .json()
                .await
                .map_err(|e| RagbotError::Index(format!("Malformed describe response: {}", e)))?;
            described.host
        } else if status == reqwest::StatusCode::NOT_FOUND {
            log::info!("Index '{}' not found, creating it", self.name);
            self.create_index().await?
        } else {
            return Err(RagbotError::Index(format!(
                "Describe failed for '{}': HTTP {}",
                self.name, status
            )));
        };

        log::debug!("Index '{}' host resolved: {}", self.name, host);
        *self.host.lock().unwrap() = Some(host);
        Ok(())
    }

    async fn create_index(&self) -> Result<String> {
        let request = CreateIndexRequest {
            name: &self.name,
            dimension: self.dimensions,
            metric: "cosine",
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", CONTROL_PLANE_URL))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagbotError::Index(format!("Create request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RagbotError::Index(format!(
                "Create failed for '{}': HTTP {}: {}",
                self.name, status, body
            )));
        }

        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| RagbotError::Index(format!("Malformed create response: {}", e)))?;
        Ok(described.host)
    }

    fn data_plane_url(&self, endpoint: &str) -> Result<String> {
        let host = self.host.lock().unwrap();
        match host.as_deref() {
            Some(host) => Ok(format!("https://{}/{}", host, endpoint)),
            None => Err(RagbotError::Index(
                "Index host unknown; ensure_index has not succeeded yet".to_string(),
            )),
        }
    }

    /// Upsert vectors into the index, returning the upserted count
    pub async fn upsert(&self, vectors: &[VectorRecord]) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors,
            namespace: self.namespace.clone(),
        };

        let url = self.data_plane_url("vectors/upsert")?;
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagbotError::Index(format!("Upsert request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RagbotError::Index(format!(
                "Upsert failed: HTTP {}: {}",
                status, body
            )));
        }

        let result: UpsertResponse = response
            .json()
            .await
            .map_err(|e| RagbotError::Index(format!("Malformed upsert response: {}", e)))?;
        Ok(result.upserted_count)
    }

    /// Query the index for the `top_k` chunks nearest to `embedding`
    pub async fn query(&self, embedding: Vec<f32>, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let request = QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
            namespace: self.namespace.clone(),
        };

        let url = self.data_plane_url("query")?;
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagbotError::Index(format!("Query request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RagbotError::Index(format!(
                "Query failed: HTTP {}: {}",
                status, body
            )));
        }

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| RagbotError::Index(format!("Malformed query response: {}", e)))?;
        Ok(result.matches)
    }
}
