use crate::answer::AnswerEngine;
use crate::chat::{ChatEvent, Dispatcher, Notifier};
use crate::error::{RagbotError, Result};
use crate::pipeline::IngestPipeline;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Outbound notice as written to the gateway
#[derive(Serialize)]
struct NoticeLine<'a> {
    channel_id: &'a str,
    text: &'a str,
}

/// Notifier that writes JSON notice lines to stdout.
///
/// The chat gateway on the other side of the pipe owns the actual platform
/// session; we only speak newline-delimited JSON to it. Writes are
/// serialized so concurrent message tasks can't interleave half-lines.
pub struct StdioNotifier {
    out: tokio::sync::Mutex<tokio::io::Stdout>,
}

impl StdioNotifier {
    pub fn new() -> Self {
        Self {
            out: tokio::sync::Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdioNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for StdioNotifier {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<()> {
        let line = serde_json::to_string(&NoticeLine { channel_id, text })
            .map_err(|e| RagbotError::Chat(format!("Failed to encode notice: {}", e)))?;

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| RagbotError::Chat(format!("Failed to write notice: {}", e)))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| RagbotError::Chat(format!("Failed to write notice: {}", e)))?;
        out.flush()
            .await
            .map_err(|e| RagbotError::Chat(format!("Failed to flush notice: {}", e)))?;
        Ok(())
    }
}

/// The production dispatcher wiring
pub type BotDispatcher = Dispatcher<StdioNotifier, IngestPipeline, AnswerEngine>;

/// Read chat events from stdin until EOF, handling each in its own task.
///
/// One spawned task per inbound event; the dispatcher is the error boundary,
/// so a failing task never takes this loop down. Malformed event lines are
/// logged and skipped.
pub async fn run_gateway(dispatcher: Arc<BotDispatcher>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(RagbotError::Io)?;

        // EOF - gateway disconnected
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: ChatEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Ignoring malformed chat event: {}", e);
                continue;
            }
        };

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            dispatcher.on_message(event).await;
        });
    }

    log::info!("Gateway closed, shutting down");
    Ok(())
}
