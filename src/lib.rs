pub mod answer;
pub mod chat;
pub mod config;
pub mod crawl;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod quota;
pub mod source;

pub use config::Config;
pub use error::{RagbotError, Result};
