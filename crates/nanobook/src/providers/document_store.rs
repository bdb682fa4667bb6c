//! Document store provider trait for keeping uploaded source files

use async_trait::async_trait;

use crate::error::Result;

/// A file written to the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Filename after sanitising
    pub filename: String,
    /// Storage path, reported back to clients and recorded as the chunk source
    pub path: String,
}

/// Trait for document storage
///
/// Implementations:
/// - `LocalDocumentStore`: Local upload directory
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Store a document under its (sanitised) filename
    async fn save(&self, filename: &str, data: &[u8]) -> Result<StoredFile>;

    /// Delete a stored document by path
    async fn remove(&self, path: &str) -> Result<()>;

    /// Delete every stored file, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Keep only the final path component of a client-supplied filename
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("flu.txt").as_deref(), Some("flu.txt"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.md").as_deref(), Some("notes.md"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("  "), None);
    }
}
