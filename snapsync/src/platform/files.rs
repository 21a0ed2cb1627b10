//! Local filesystem implementation of [`FileManager`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{BoxFuture, FileManager};
use crate::error::{SyncError, SyncResult};

/// Default timeout for a single file download in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// File manager backed by `tokio::fs`, downloading with reqwest.
#[derive(Debug, Clone)]
pub struct LocalFileManager {
    client: Client,
}

impl Default for LocalFileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFileManager {
    /// Create a file manager with the default download timeout.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a file manager with a custom download timeout.
    pub fn with_timeout(timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    /// Create a file manager sharing an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Default per-file download timeout.
    pub fn default_timeout() -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    async fn ensure_parent(path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::file_op("create_dir", parent, e))?;
        }
        Ok(())
    }

    async fn copy_tree_impl(source: &Path, target: &Path) -> SyncResult<()> {
        let mut pending: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), target.to_path_buf())];

        while let Some((src, dst)) = pending.pop() {
            let meta = fs::metadata(&src)
                .await
                .map_err(|e| SyncError::file_op("copy", &src, e))?;

            if meta.is_dir() {
                fs::create_dir_all(&dst)
                    .await
                    .map_err(|e| SyncError::file_op("create_dir", &dst, e))?;
                let mut entries = fs::read_dir(&src)
                    .await
                    .map_err(|e| SyncError::file_op("list", &src, e))?;
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| SyncError::file_op("list", &src, e))?
                {
                    pending.push((entry.path(), dst.join(entry.file_name())));
                }
            } else {
                Self::ensure_parent(&dst).await?;
                fs::copy(&src, &dst)
                    .await
                    .map_err(|e| SyncError::file_op("copy", &src, e))?;
            }
        }

        Ok(())
    }

    async fn download_impl(&self, url: &str, target: &Path) -> SyncResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                message: format!("download of {} failed", url),
            });
        }

        Self::ensure_parent(target).await?;
        let mut file = fs::File::create(target)
            .await
            .map_err(|e| SyncError::file_op("download", target, e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SyncError::network(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::file_op("download", target, e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| SyncError::file_op("download", target, e))?;

        Ok(written)
    }
}

impl FileManager for LocalFileManager {
    fn copy_tree<'a>(
        &'a self,
        source: &'a Path,
        target: &'a Path,
    ) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(Self::copy_tree_impl(source, target))
    }

    fn remove<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            let meta = match fs::symlink_metadata(path).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(SyncError::file_op("remove", path, e)),
            };

            let result = if meta.is_dir() {
                fs::remove_dir_all(path).await
            } else {
                fs::remove_file(path).await
            };

            match result {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(SyncError::file_op("remove", path, e)),
            }
        })
    }

    fn download_file<'a>(
        &'a self,
        url: &'a str,
        target: &'a Path,
    ) -> BoxFuture<'a, SyncResult<u64>> {
        Box::pin(self.download_impl(url, target))
    }

    fn copy_files<'a>(
        &'a self,
        source: &'a Path,
        target: &'a Path,
        hrefs: &'a [String],
    ) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            for href in hrefs {
                let relative = href.trim_start_matches('/');
                let src = source.join(relative);
                let dst = target.join(relative);
                Self::ensure_parent(&dst).await?;
                fs::copy(&src, &dst)
                    .await
                    .map_err(|e| SyncError::file_op("copy", &src, e))?;
            }
            Ok(())
        })
    }

    fn list_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<Vec<String>>> {
        Box::pin(async move {
            let mut entries = fs::read_dir(path)
                .await
                .map_err(|e| SyncError::file_op("list", path, e))?;
            let mut names = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SyncError::file_op("list", path, e))?
            {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(names)
        })
    }

    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<String>> {
        Box::pin(async move {
            fs::read_to_string(path)
                .await
                .map_err(|e| SyncError::file_op("read", path, e))
        })
    }

    fn write_string<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a str,
    ) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            Self::ensure_parent(path).await?;
            fs::write(path, contents)
                .await
                .map_err(|e| SyncError::file_op("write", path, e))
        })
    }
}
