//! Capability interfaces the engine consumes, plus local implementations.
//!
//! The engine never touches the filesystem, the preference store or the
//! webview directly. Everything goes through the traits defined here so the
//! host (a mobile shell, a desktop wrapper, the CLI, a test) can supply its
//! own transport.
//!
//! # Design Principles
//!
//! - **Dyn-compatible**: async methods return [`BoxFuture`] so collaborators
//!   can be held as `Arc<dyn Trait>`
//! - **Resolved once**: static platform facts live in [`PlatformInfo`] and are
//!   injected at construction instead of being probed on every call
//! - **Idempotent removal**: `remove` on a missing path succeeds

mod files;
mod info;
mod navigation;
mod store;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

pub use files::LocalFileManager;
pub use info::{PlatformInfo, BASE_VERSION_ID, MANIFEST_FILE};
pub use navigation::{FileNavigation, MemoryNavigation};
pub use store::{JsonFilePreferencesStore, MemoryPreferencesStore};

use crate::error::SyncResult;
use crate::http::HttpClient;
use crate::preferences::Preferences;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Native file operations used to assemble snapshot directories.
pub trait FileManager: Send + Sync {
    /// Recursively copy a file or directory tree to `target`.
    fn copy_tree<'a>(&'a self, source: &'a Path, target: &'a Path)
        -> BoxFuture<'a, SyncResult<()>>;

    /// Remove a file or directory tree. Succeeds if nothing exists at `path`.
    fn remove<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>>;

    /// Download `url` into `target`, creating parent directories.
    ///
    /// Returns the number of bytes written.
    fn download_file<'a>(&'a self, url: &'a str, target: &'a Path)
        -> BoxFuture<'a, SyncResult<u64>>;

    /// Copy each relative path in `hrefs` from `source` to `target`.
    fn copy_files<'a>(
        &'a self,
        source: &'a Path,
        target: &'a Path,
        hrefs: &'a [String],
    ) -> BoxFuture<'a, SyncResult<()>>;

    /// Names of the entries directly inside `path`.
    fn list_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<Vec<String>>>;

    /// Read a UTF-8 file.
    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<String>>;

    /// Write a UTF-8 file, creating parent directories.
    fn write_string<'a>(&'a self, path: &'a Path, contents: &'a str)
        -> BoxFuture<'a, SyncResult<()>>;

    /// Relative paths of every file under `root`, `/`-separated.
    ///
    /// An entry whose name contains no `.` is treated as a subdirectory and
    /// descended into; if listing it fails it is skipped. Extensionless files
    /// are therefore never reported, and dotted directory names are reported
    /// as files. Callers rely on this exact behavior.
    fn list_files_recursive<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, SyncResult<Vec<String>>> {
        Box::pin(async move {
            let mut files = Vec::new();
            let mut pending: Vec<(PathBuf, String)> = Vec::new();

            for name in self.list_dir(root).await? {
                pending.push((root.join(&name), name));
            }

            while let Some((path, relative)) = pending.pop() {
                let name = relative.rsplit('/').next().unwrap_or(&relative);
                if name.contains('.') {
                    files.push(relative);
                    continue;
                }
                match self.list_dir(&path).await {
                    Ok(children) => {
                        for child in children {
                            pending.push((path.join(&child), format!("{}/{}", relative, child)));
                        }
                    }
                    Err(e) => {
                        tracing::trace!(path = %path.display(), error = %e, "skipping unlistable entry");
                    }
                }
            }

            files.sort();
            Ok(files)
        })
    }
}

/// Persistent storage for the preference blob.
pub trait PreferencesStore: Send + Sync {
    /// Load the stored preferences, `None` on first run.
    fn load(&self) -> BoxFuture<'_, SyncResult<Option<Preferences>>>;

    /// Replace the stored preferences.
    fn save<'a>(&'a self, prefs: &'a Preferences) -> BoxFuture<'a, SyncResult<()>>;
}

/// Control over which directory the webview serves from.
pub trait NavigationControl: Send + Sync {
    /// Directory currently being served.
    fn active_base_path(&self) -> BoxFuture<'_, SyncResult<PathBuf>>;

    /// Redirect the webview root to `path`.
    fn set_active_base_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>>;

    /// Make the current base path survive an app restart.
    fn persist_base_path(&self) -> BoxFuture<'_, SyncResult<()>>;
}

/// Network reachability.
pub trait Connectivity: Send + Sync {
    /// Whether the device currently believes it is online.
    fn is_online(&self) -> bool;
}

/// Connectivity that always reports online.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Connectivity with a fixed, caller-controlled answer.
#[derive(Debug, Default)]
pub struct StaticConnectivity {
    online: std::sync::atomic::AtomicBool,
}

impl StaticConnectivity {
    /// Create with the given initial state.
    pub fn new(online: bool) -> Self {
        Self {
            online: std::sync::atomic::AtomicBool::new(online),
        }
    }

    /// Change the reported state.
    pub fn set_online(&self, online: bool) {
        self.online
            .store(online, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// The set of host collaborators an engine is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn HttpClient>,
    pub files: Arc<dyn FileManager>,
    pub store: Arc<dyn PreferencesStore>,
    pub navigation: Arc<dyn NavigationControl>,
    pub connectivity: Arc<dyn Connectivity>,
}
