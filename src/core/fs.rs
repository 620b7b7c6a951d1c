//! Filesystem collaborator used by the pipeline.
//!
//! Everything goes through this trait so tests can swap in an in-memory or
//! failure-injecting implementation.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

use super::auditor::ExistsProbe;
use crate::utils::file_detection::is_image_file;

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether anything exists at `path`.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Lists the entries directly inside `path`.
    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Creates `path` and all missing parents.
    async fn ensure_directory(&self, path: &Path) -> io::Result<()>;

    /// Recursively collects image files below `root`, sorted by path.
    async fn list_image_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in self.list_directory(&dir).await? {
                if self.is_directory(&entry).await {
                    pending.push(entry);
                } else if is_image_file(&entry.to_string_lossy()) {
                    images.push(entry);
                }
            }
        }

        images.sort();
        Ok(images)
    }

    /// Whether `path` is a directory. Errors count as "not a directory".
    async fn is_directory(&self, path: &Path) -> bool;
}

/// The real filesystem, backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(path).await?;
        while let Some(entry) = reader.next_entry().await? {
            entries.push(entry.path());
        }
        Ok(entries)
    }

    async fn ensure_directory(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn is_directory(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ExistsProbe for TokioFileSystem {
    async fn exists(&self, path: &str) -> io::Result<bool> {
        FileSystem::exists(self, Path::new(path)).await
    }
}
