pub mod github;
pub mod url;

pub use github::GithubClient;
pub use url::{parse_source_url, RepoSource};

use crate::error::Result;

/// A validated entry from a tree listing
///
/// Built from the untyped listing JSON at the boundary; anything that isn't
/// recognizably a file or a directory never reaches the crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File {
        name: String,
        path: String,
        download_url: String,
    },
    Directory {
        name: String,
        path: String,
    },
}

/// One fetched text document, ready for ingestion
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source_path: String,
    pub text: String,
    pub mime_hint: String,
}

/// A remote tree of directories and files the crawler can walk.
///
/// The one seam between the crawler and the network: production uses
/// [`GithubClient`], tests use an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait TreeSource {
    /// Fetch the listing of entries under `path`
    async fn list(&self, path: &str) -> Result<Vec<TreeEntry>>;

    /// Fetch the raw content behind a file's download URL
    async fn download(&self, download_url: &str) -> Result<String>;
}
