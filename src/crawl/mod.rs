pub mod filter;

pub use filter::DocumentFilter;

use crate::error::Result;
use crate::source::{RawDocument, TreeEntry, TreeSource};

/// Destination for fetched documents.
///
/// Production writes into the vector index
/// ([`VectorSink`](crate::index::VectorSink)); tests record calls.
#[allow(async_fn_in_trait)]
pub trait DocumentSink {
    async fn ingest(&self, document: &RawDocument) -> Result<()>;
}

/// Summary of one crawl invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Directories successfully listed (including the starting path)
    pub listed_dirs: usize,
    /// Documents fetched and handed to the sink without error
    pub ingested: usize,
    /// Files skipped by the extension filter (never fetched)
    pub skipped: usize,
    /// Subtrees, content fetches, or ingestions that failed and were logged
    pub failed: usize,
}

/// Depth-first crawler over a remote tree.
///
/// Walks with an explicit stack of per-directory entry iterators rather than
/// call recursion, so tree depth costs heap instead of call stack. Sibling
/// order follows the listing exactly, and files reach the sink in that order.
///
/// Failure containment: a failed listing abandons only that subtree, a failed
/// content fetch or ingest only that file; siblings keep going. The one hard
/// failure is the starting path itself refusing to list.
pub struct Crawler<S> {
    source: S,
    filter: DocumentFilter,
}

impl<S: TreeSource> Crawler<S> {
    pub fn new(source: S, filter: DocumentFilter) -> Self {
        Self { source, filter }
    }

    /// Walk the tree from `starting_path`, feeding eligible files into `sink`.
    ///
    /// Fetches are sequential, one in flight at a time, to stay friendly to
    /// upstream rate limits.
    pub async fn crawl(
        &self,
        starting_path: &str,
        sink: &impl DocumentSink,
    ) -> Result<CrawlReport> {
        // Root listing failure fails the whole crawl; everything below is
        // best-effort.
        let root = self.source.list(starting_path).await?;

        let mut report = CrawlReport {
            listed_dirs: 1,
            ..CrawlReport::default()
        };
        let mut stack: Vec<std::vec::IntoIter<TreeEntry>> = vec![root.into_iter()];

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.next() else {
                stack.pop();
                continue;
            };

            match entry {
                TreeEntry::Directory { path, .. } => match self.source.list(&path).await {
                    Ok(entries) => {
                        report.listed_dirs += 1;
                        stack.push(entries.into_iter());
                    }
                    Err(e) => {
                        log::warn!("Abandoning subtree {}: {}", path, e);
                        report.failed += 1;
                    }
                },
                TreeEntry::File {
                    name,
                    path,
                    download_url,
                } => {
                    if !self.filter.is_eligible(&name) {
                        log::debug!("Skipping ineligible file: {}", path);
                        report.skipped += 1;
                        continue;
                    }

                    let text = match self.source.download(&download_url).await {
                        Ok(text) => text,
                        Err(e) => {
                            log::warn!("Skipping file {}: {}", path, e);
                            report.failed += 1;
                            continue;
                        }
                    };

                    let document = RawDocument {
                        source_path: path.clone(),
                        text,
                        mime_hint: "text/plain".to_string(),
                    };

                    match sink.ingest(&document).await {
                        Ok(()) => report.ingested += 1,
                        Err(e) => {
                            log::warn!("Ingestion failed for {}: {}", path, e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        log::info!(
            "Crawl of '{}' done: {} dir(s) listed, {} ingested, {} skipped, {} failed",
            starting_path,
            report.listed_dirs,
            report.ingested,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
