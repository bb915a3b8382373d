pub mod pinecone;
pub mod sink;

pub use pinecone::{ChunkMetadata, PineconeIndex, ScoredChunk, VectorRecord};
pub use sink::VectorSink;
