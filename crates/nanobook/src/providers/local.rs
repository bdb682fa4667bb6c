//! Local filesystem document store

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::document_store::{sanitize_filename, DocumentStoreProvider, StoredFile};
use crate::error::{Error, Result};

/// Stores uploads as plain files in one directory
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    /// Create a store rooted at `root` (created on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Upload directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentStoreProvider for LocalDocumentStore {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<StoredFile> {
        let filename = sanitize_filename(filename)
            .ok_or_else(|| Error::bad_request(format!("Invalid filename: {:?}", filename)))?;

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&filename);
        tokio::fs::write(&path, data).await?;

        tracing::debug!("Saved {} ({} bytes)", path.display(), data.len());

        Ok(StoredFile {
            filename,
            path: path.to_string_lossy().to_string(),
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Error deleting file {}: {}", path.display(), e),
            }
        }

        tracing::info!("Removed {} files from {}", removed, self.root.display());
        Ok(removed)
    }

    fn name(&self) -> &str {
        "local"
    }
}
