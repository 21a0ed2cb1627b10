//! Test doubles shared by unit tests.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{SyncError, SyncResult};
use crate::platform::{BoxFuture, FileManager, LocalFileManager};

/// Real local file operations, with downloads faked and recorded.
///
/// A download writes the URL itself as the file body. URLs containing any
/// registered failure pattern fail instead.
#[derive(Default)]
pub struct RecordingFileManager {
    inner: LocalFileManager,
    downloads: Mutex<Vec<(String, PathBuf)>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingFileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make downloads whose URL contains `pattern` fail.
    pub fn fail_downloads_matching(&self, pattern: &str) {
        self.failing.lock().push(pattern.to_string());
    }

    /// Stop failing any downloads.
    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Every attempted download as (url, target).
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().clone()
    }
}

impl FileManager for RecordingFileManager {
    fn copy_tree<'a>(&'a self, source: &'a Path, target: &'a Path) -> BoxFuture<'a, SyncResult<()>> {
        self.inner.copy_tree(source, target)
    }

    fn remove<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>> {
        self.inner.remove(path)
    }

    fn download_file<'a>(&'a self, url: &'a str, target: &'a Path) -> BoxFuture<'a, SyncResult<u64>> {
        self.downloads
            .lock()
            .push((url.to_string(), target.to_path_buf()));
        let fails = self.failing.lock().iter().any(|p| url.contains(p.as_str()));
        Box::pin(async move {
            if fails {
                return Err(SyncError::network(url, "simulated transfer failure"));
            }
            self.inner.write_string(target, url).await?;
            Ok(url.len() as u64)
        })
    }

    fn copy_files<'a>(
        &'a self,
        source: &'a Path,
        target: &'a Path,
        hrefs: &'a [String],
    ) -> BoxFuture<'a, SyncResult<()>> {
        self.inner.copy_files(source, target, hrefs)
    }

    fn list_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<Vec<String>>> {
        self.inner.list_dir(path)
    }

    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<String>> {
        self.inner.read_to_string(path)
    }

    fn write_string<'a>(&'a self, path: &'a Path, contents: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        self.inner.write_string(path, contents)
    }
}
