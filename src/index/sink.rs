use crate::crawl::DocumentSink;
use crate::embeddings::OpenAiEmbedder;
use crate::error::{RagbotError, Result};
use crate::index::{ChunkMetadata, PineconeIndex, VectorRecord};
use crate::source::RawDocument;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Hex-encoded SHA-256 of a document segment, stored in vector metadata.
///
/// Recorded for observability only; ids stay random, so re-ingesting the
/// same path still creates new chunks (known duplication gap).
pub fn content_sha256(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Ingestion sink backed by the vector index
///
/// Treats a whole file as one segment (no size-based chunking), embeds it,
/// and upserts the resulting vector with its metadata.
pub struct VectorSink {
    embedder: Arc<OpenAiEmbedder>,
    index: Arc<PineconeIndex>,
}

impl VectorSink {
    pub fn new(embedder: Arc<OpenAiEmbedder>, index: Arc<PineconeIndex>) -> Self {
        Self { embedder, index }
    }
}

impl DocumentSink for VectorSink {
    async fn ingest(&self, document: &RawDocument) -> Result<()> {
        let segments = vec![document.text.clone()];

        let embeddings = self
            .embedder
            .embed_batch(segments.clone())
            .await
            .map_err(|e| RagbotError::Ingestion {
                source_path: document.source_path.clone(),
                reason: e.to_string(),
            })?;

        let ingested_at = chrono::Utc::now().to_rfc3339();
        let vectors: Vec<VectorRecord> = segments
            .into_iter()
            .zip(embeddings)
            .map(|(text, values)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: ChunkMetadata {
                    source_path: document.source_path.clone(),
                    content_sha256: content_sha256(&text),
                    ingested_at: ingested_at.clone(),
                    text,
                },
            })
            .collect();

        let count = self
            .index
            .upsert(&vectors)
            .await
            .map_err(|e| RagbotError::Ingestion {
                source_path: document.source_path.clone(),
                reason: e.to_string(),
            })?;

        log::info!(
            "Ingested {} ({} vector(s) upserted)",
            document.source_path,
            count
        );
        Ok(())
    }
}
