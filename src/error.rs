use thiserror::Error;

/// Main error type for ragbot
#[derive(Error, Debug)]
pub enum RagbotError {
    /// Ingestion source URL does not match the supported GitHub tree shape
    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    /// Network failure or non-2xx response on a listing/content fetch
    #[error("Fetch failed for {path}: {reason}")]
    Fetch { path: String, reason: String },

    /// A fetch or a whole crawl exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Vector-index upsert failure for one document
    #[error("Ingestion failed for {source_path}: {reason}")]
    Ingestion { source_path: String, reason: String },

    /// Embedding API errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Vector-index control/data plane errors outside of per-document upserts
    #[error("Vector index error: {0}")]
    Index(String),

    /// Answer-generation (chat completion) errors
    #[error("Completion error: {0}")]
    Completion(String),

    /// Failure to deliver a chat notice
    #[error("Chat error: {0}")]
    Chat(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire data (listing entries, chat events)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenient Result type using RagbotError
pub type Result<T> = std::result::Result<T, RagbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagbotError::InvalidSourceUrl("http://example.com".to_string());
        assert!(err.to_string().contains("Invalid source URL"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_fetch_error_carries_path() {
        let err = RagbotError::Fetch {
            path: "docs/guide".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert!(err.to_string().contains("docs/guide"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagbotError = io_err.into();
        assert!(matches!(err, RagbotError::Io(_)));
    }
}
