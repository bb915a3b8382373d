use crate::error::{RagbotError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A parsed ingestion source: contents-API base URL plus starting path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSource {
    /// Base URL of the contents API, with trailing slash
    /// (e.g. `https://api.github.com/repos/acme/repo/contents/`)
    pub api_url: String,
    /// Path within the repository to start crawling from
    pub starting_path: String,
}

fn source_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Branch is restricted to the two conventional default-branch names.
        Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/tree/(main|master)/(.+)$")
            .expect("source URL regex is valid")
    })
}

/// Parse a user-supplied GitHub tree URL into a [`RepoSource`].
///
/// Accepts `https://github.com/<owner>/<repo>/tree/(main|master)/<path>`;
/// anything else is [`RagbotError::InvalidSourceUrl`].
pub fn parse_source_url(source_url: &str) -> Result<RepoSource> {
    let captures = source_url_regex()
        .captures(source_url)
        .ok_or_else(|| RagbotError::InvalidSourceUrl(source_url.to_string()))?;

    let owner = &captures[1];
    let repo = &captures[2];
    let starting_path = captures[4].to_string();

    Ok(RepoSource {
        api_url: format!("https://api.github.com/repos/{}/{}/contents/", owner, repo),
        starting_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree_url() {
        let source = parse_source_url("https://github.com/acme/repo/tree/main/docs").unwrap();
        assert_eq!(source.api_url, "https://api.github.com/repos/acme/repo/contents/");
        assert_eq!(source.starting_path, "docs");
    }

    #[test]
    fn test_parse_master_branch_and_nested_path() {
        let source =
            parse_source_url("https://github.com/acme/repo/tree/master/docs/guides/api").unwrap();
        assert_eq!(source.starting_path, "docs/guides/api");
    }

    #[test]
    fn test_rejects_missing_tree_marker() {
        let err = parse_source_url("https://github.com/acme/repo/docs").unwrap_err();
        assert!(matches!(err, RagbotError::InvalidSourceUrl(_)));
    }

    #[test]
    fn test_rejects_unknown_branch() {
        let err = parse_source_url("https://github.com/acme/repo/tree/develop/docs").unwrap_err();
        assert!(matches!(err, RagbotError::InvalidSourceUrl(_)));
    }

    #[test]
    fn test_rejects_other_hosts() {
        let err = parse_source_url("https://gitlab.com/acme/repo/tree/main/docs").unwrap_err();
        assert!(matches!(err, RagbotError::InvalidSourceUrl(_)));
    }

    #[test]
    fn test_rejects_missing_path() {
        // A tree URL pointing at the branch root carries no path segment
        let err = parse_source_url("https://github.com/acme/repo/tree/main").unwrap_err();
        assert!(matches!(err, RagbotError::InvalidSourceUrl(_)));
    }
}
