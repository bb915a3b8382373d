use crate::config::GithubConfig;
use crate::error::{RagbotError, Result};
use crate::source::{TreeEntry, TreeSource};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// One raw entry as returned by the GitHub contents API
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(rename = "type", default)]
    kind: String,
    download_url: Option<String>,
}

impl RawEntry {
    /// Validate a raw listing entry into a [`TreeEntry`].
    ///
    /// Returns `None` for entries we can't act on (unknown type, missing
    /// fields, file without a download URL) so one malformed entry never
    /// poisons the rest of the listing.
    fn validate(self) -> Option<TreeEntry> {
        if self.name.is_empty() || self.path.is_empty() {
            log::warn!("Dropping listing entry with missing name/path");
            return None;
        }
        match self.kind.as_str() {
            "dir" => Some(TreeEntry::Directory {
                name: self.name,
                path: self.path,
            }),
            "file" => match self.download_url {
                Some(download_url) => Some(TreeEntry::File {
                    name: self.name,
                    path: self.path,
                    download_url,
                }),
                None => {
                    log::warn!("Dropping file entry without download_url: {}", self.path);
                    None
                }
            },
            other => {
                // Submodules and symlinks show up here; we don't follow them.
                log::debug!("Ignoring listing entry of type '{}': {}", other, self.path);
                None
            }
        }
    }
}

/// GitHub contents API client for one repository
///
/// Holds the contents-API base URL produced by
/// [`parse_source_url`](crate::source::parse_source_url), so listing a path
/// is just `base_url + path`.
pub struct GithubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    user_agent: String,
}

impl GithubClient {
    /// Create a client for the repository behind `base_url`.
    ///
    /// `token` is optional; unauthenticated requests work against public
    /// repositories with lower rate limits.
    pub fn new(config: &GithubConfig, token: Option<String>, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            token,
            user_agent: config.user_agent.clone(),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header("User-Agent", &self.user_agent);
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("token {}", token));
        }
        builder
    }
}

impl TreeSource for GithubClient {
    async fn list(&self, path: &str) -> Result<Vec<TreeEntry>> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("Listing contents of {}", url);

        let response = self.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                RagbotError::Timeout(format!("listing {}", path))
            } else {
                RagbotError::Fetch {
                    path: path.to_string(),
                    reason: format!("Network error: {}", e),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagbotError::Fetch {
                path: path.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let entries: Vec<RawEntry> = response.json().await.map_err(|e| RagbotError::Parse(
            format!("Malformed listing for {}: {}", path, e),
        ))?;

        Ok(entries.into_iter().filter_map(RawEntry::validate).collect())
    }

    async fn download(&self, download_url: &str) -> Result<String> {
        log::debug!("Downloading file: {}", download_url);

        let response = self.get(download_url).send().await.map_err(|e| {
            if e.is_timeout() {
                RagbotError::Timeout(format!("downloading {}", download_url))
            } else {
                RagbotError::Fetch {
                    path: download_url.to_string(),
                    reason: format!("Network error: {}", e),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagbotError::Fetch {
                path: download_url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RagbotError::Fetch {
            path: download_url.to_string(),
            reason: format!("Failed to read body: {}", e),
        })?;

        // Ingestion only handles non-empty UTF-8 text; the extension filter
        // should have excluded binaries upstream, but the server is not
        // obliged to agree with the file name.
        let text = String::from_utf8(bytes.to_vec()).map_err(|_| RagbotError::Fetch {
            path: download_url.to_string(),
            reason: "Content is not valid UTF-8".to_string(),
        })?;

        if text.is_empty() {
            return Err(RagbotError::Fetch {
                path: download_url.to_string(),
                reason: "Empty file content".to_string(),
            });
        }

        Ok(text)
    }
}
