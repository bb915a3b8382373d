/// Decides which discovered files are worth fetching.
///
/// Filtering happens before any content download, so ineligible files cost
/// neither bandwidth nor embedding calls.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    allowed_extensions: Vec<String>,
}

impl DocumentFilter {
    /// Build a filter from an extension allow-list (stored lower-cased)
    pub fn new(extensions: &[String]) -> Self {
        Self {
            allowed_extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Whether `file_name` carries an allow-listed extension.
    ///
    /// Case-insensitive on the substring after the last `.`; a name with no
    /// extension is never eligible.
    pub fn is_eligible(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((_, extension)) if !extension.is_empty() => self
                .allowed_extensions
                .contains(&extension.to_lowercase()),
            _ => false,
        }
    }
}
