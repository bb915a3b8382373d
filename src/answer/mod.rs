use crate::chat::Answerer;
use crate::config::CompletionConfig;
use crate::embeddings::OpenAiEmbedder;
use crate::error::{RagbotError, Result};
use crate::index::{PineconeIndex, ScoredChunk};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer the user's \
question using only the provided context. If the context does not contain the \
answer, say so instead of guessing.";

/// Retry budget for the question-embedding call
const EMBED_RETRIES: usize = 3;

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Retrieval-augmented answer generation.
///
/// Embeds the question, pulls the nearest chunks from the vector index, and
/// asks the completion model to phrase an answer over that context.
pub struct AnswerEngine {
    client: Client,
    api_key: String,
    model: String,
    top_k: usize,
    embedder: Arc<OpenAiEmbedder>,
    index: Arc<PineconeIndex>,
}

impl AnswerEngine {
    pub fn new(
        config: &CompletionConfig,
        api_key: String,
        embedder: Arc<OpenAiEmbedder>,
        index: Arc<PineconeIndex>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model: config.model.clone(),
            top_k: config.top_k,
            embedder,
            index,
        }
    }

    async fn complete(&self, question: &str, context: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Context:\n{}\n\nQuestion: {}", context, question),
                },
            ],
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagbotError::Completion(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RagbotError::Completion(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| RagbotError::Completion(format!("Failed to parse response: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagbotError::Completion("Empty completion response".to_string()))
    }
}

impl Answerer for AnswerEngine {
    async fn answer(&self, question: &str) -> Result<String> {
        let embedding = self
            .embedder
            .embed_query(question, EMBED_RETRIES)
            .await?;

        let matches = self.index.query(embedding, self.top_k).await?;
        let context = context_from(&matches);

        if context.is_empty() {
            log::info!("No indexed context found for question");
            return Ok(
                "I couldn't find anything relevant in the indexed documentation. \
                 Try uploading the docs first with /upload."
                    .to_string(),
            );
        }

        self.complete(question, &context).await
    }
}

/// Assemble the retrieved chunks into a context block, labelling each with
/// its source path. Chunks without metadata contribute nothing.
fn context_from(matches: &[ScoredChunk]) -> String {
    matches
        .iter()
        .filter_map(|chunk| chunk.metadata.as_ref())
        .map(|metadata| format!("[{}]\n{}", metadata.source_path, metadata.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkMetadata;

    fn chunk(source_path: &str, text: &str) -> ScoredChunk {
        ScoredChunk {
            id: "id".to_string(),
            score: 0.9,
            metadata: Some(ChunkMetadata {
                source_path: source_path.to_string(),
                text: text.to_string(),
                content_sha256: String::new(),
                ingested_at: String::new(),
            }),
        }
    }

    #[test]
    fn test_context_labels_each_chunk_with_source() {
        let context = context_from(&[chunk("docs/a.md", "Alpha"), chunk("docs/b.md", "Beta")]);
        assert!(context.contains("[docs/a.md]\nAlpha"));
        assert!(context.contains("[docs/b.md]\nBeta"));
    }

    #[test]
    fn test_context_skips_chunks_without_metadata() {
        let bare = ScoredChunk {
            id: "id".to_string(),
            score: 0.5,
            metadata: None,
        };
        assert!(context_from(&[bare]).is_empty());
    }

    #[test]
    fn test_completion_response_parses() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "42"}}]}"#;
        let result: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(result.choices[0].message.content, "42");
    }
}
