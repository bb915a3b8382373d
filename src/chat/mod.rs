pub mod dispatcher;
pub mod transport;

pub use dispatcher::{Answerer, Dispatcher, Ingestor};
pub use transport::{run_gateway, BotDispatcher, StdioNotifier};

use crate::error::Result;
use serde::Deserialize;

/// One inbound chat-platform message, as delivered by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    pub channel_id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_is_bot: bool,
    pub content: String,
}

/// Delivers plain-text notices back to a channel.
///
/// Production writes JSON lines to stdout for the gateway to forward; tests
/// record what would have been sent.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<()>;
}
