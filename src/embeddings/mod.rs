pub mod cache;
pub mod openai;

pub use cache::EmbeddingCache;
pub use openai::OpenAiEmbedder;
