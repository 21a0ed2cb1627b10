//! Navigation control implementations.
//!
//! A real host redirects its webview. These implementations record the
//! served directory so the engine can run outside such a host.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{BoxFuture, NavigationControl};
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationState {
    active: PathBuf,
    persisted: PathBuf,
}

/// Navigation state kept in memory.
#[derive(Debug)]
pub struct MemoryNavigation {
    state: Mutex<NavigationState>,
    redirects: Mutex<Vec<PathBuf>>,
}

impl MemoryNavigation {
    /// Start serving from `initial`.
    pub fn new(initial: impl Into<PathBuf>) -> Self {
        let initial = initial.into();
        Self {
            state: Mutex::new(NavigationState {
                active: initial.clone(),
                persisted: initial,
            }),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Every path passed to `set_active_base_path`, in order.
    pub fn redirects(&self) -> Vec<PathBuf> {
        self.redirects.lock().clone()
    }

    /// The path that would be served after a restart.
    pub fn persisted(&self) -> PathBuf {
        self.state.lock().persisted.clone()
    }
}

impl NavigationControl for MemoryNavigation {
    fn active_base_path(&self) -> BoxFuture<'_, SyncResult<PathBuf>> {
        let active = self.state.lock().active.clone();
        Box::pin(async move { Ok(active) })
    }

    fn set_active_base_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>> {
        self.state.lock().active = path.to_path_buf();
        self.redirects.lock().push(path.to_path_buf());
        Box::pin(async { Ok(()) })
    }

    fn persist_base_path(&self) -> BoxFuture<'_, SyncResult<()>> {
        {
            let mut state = self.state.lock();
            state.persisted = state.active.clone();
        }
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedNavigation {
    persisted: PathBuf,
}

/// Navigation backed by a small JSON file holding the persisted base path.
///
/// A redirect lasts as long as this value (and its clones). A new
/// `FileNavigation` over the same file starts from the persisted path, the
/// way a restarted webview does.
#[derive(Debug, Clone)]
pub struct FileNavigation {
    state_file: PathBuf,
    default_path: PathBuf,
    redirected: Arc<Mutex<Option<PathBuf>>>,
}

impl FileNavigation {
    /// Track navigation in `state_file`, serving `default_path` until a path is persisted.
    pub fn new(state_file: impl Into<PathBuf>, default_path: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            default_path: default_path.into(),
            redirected: Arc::new(Mutex::new(None)),
        }
    }

    async fn read_persisted(&self) -> SyncResult<PathBuf> {
        match fs::read_to_string(&self.state_file).await {
            Ok(contents) => serde_json::from_str::<PersistedNavigation>(&contents)
                .map(|state| state.persisted)
                .map_err(|e| {
                    SyncError::Persistence(format!(
                        "failed to parse {}: {}",
                        self.state_file.display(),
                        e
                    ))
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(self.default_path.clone()),
            Err(e) => Err(SyncError::file_op("read", &self.state_file, e)),
        }
    }

    async fn write_persisted(&self, persisted: PathBuf) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(&PersistedNavigation { persisted })
            .map_err(|e| SyncError::Persistence(e.to_string()))?;
        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::file_op("create_dir", parent, e))?;
        }
        fs::write(&self.state_file, json)
            .await
            .map_err(|e| SyncError::file_op("write", &self.state_file, e))
    }
}

impl NavigationControl for FileNavigation {
    fn active_base_path(&self) -> BoxFuture<'_, SyncResult<PathBuf>> {
        Box::pin(async move {
            let redirected = self.redirected.lock().clone();
            match redirected {
                Some(path) => Ok(path),
                None => self.read_persisted().await,
            }
        })
    }

    fn set_active_base_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, SyncResult<()>> {
        *self.redirected.lock() = Some(path.to_path_buf());
        Box::pin(async { Ok(()) })
    }

    fn persist_base_path(&self) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            let active = self.active_base_path().await?;
            self.write_persisted(active).await
        })
    }
}
