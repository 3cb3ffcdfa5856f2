//! Local filesystem state storage.
//!
//! Writes are atomic (temp file, then rename) so an interrupted save never
//! leaves a truncated state file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::StateDocument;
use crate::storage::StateStore;

/// JSON file state backend.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<StateDocument>> {
        let Some(bytes) = self.read_bytes().await.map_err(AppError::persistence)? else {
            log::info!("No state file at {}", self.path.display());
            return Ok(None);
        };
        let document = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::persistence(format!("{} is not a valid state file: {e}", self.path.display()))
        })?;
        Ok(Some(document))
    }

    async fn save(&self, document: &StateDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::persistence(format!("{}: {e}", self.path.display())))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::persistence(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::SeenState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("state.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("nested/state.json"));

        let links: BTreeSet<String> = ["https://example.com/jobs/1".to_string()].into();
        let document = StateDocument::new(SeenState::Links(links), 1);
        store.save(&document).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, document);
        assert!(!tmp.path().join("nested/state.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = LocalStateStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("state.json"));

        store.save(&StateDocument::empty()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        // Clearing twice is fine
        store.clear().await.unwrap();
    }
}
