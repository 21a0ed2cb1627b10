//! Preference store implementations.

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::fs;

use super::{BoxFuture, PreferencesStore};
use crate::error::{SyncError, SyncResult};
use crate::preferences::Preferences;

/// Stores preferences as a JSON document on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target, so
/// a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFilePreferencesStore {
    path: PathBuf,
}

impl JsonFilePreferencesStore {
    /// Create a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferencesStore for JsonFilePreferencesStore {
    fn load(&self) -> BoxFuture<'_, SyncResult<Option<Preferences>>> {
        Box::pin(async move {
            let contents = match fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(SyncError::Persistence(format!(
                        "failed to read {}: {}",
                        self.path.display(),
                        e
                    )))
                }
            };

            serde_json::from_str(&contents).map(Some).map_err(|e| {
                SyncError::Persistence(format!("failed to parse {}: {}", self.path.display(), e))
            })
        })
    }

    fn save<'a>(&'a self, prefs: &'a Preferences) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            let json = serde_json::to_string_pretty(prefs)
                .map_err(|e| SyncError::Persistence(e.to_string()))?;

            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    SyncError::Persistence(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }

            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, json).await.map_err(|e| {
                SyncError::Persistence(format!("failed to write {}: {}", tmp.display(), e))
            })?;
            fs::rename(&tmp, &self.path).await.map_err(|e| {
                SyncError::Persistence(format!(
                    "failed to replace {}: {}",
                    self.path.display(),
                    e
                ))
            })
        })
    }
}

/// In-memory store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    prefs: Mutex<Option<Preferences>>,
    saves: Mutex<usize>,
}

impl MemoryPreferencesStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds preferences.
    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            prefs: Mutex::new(Some(prefs)),
            saves: Mutex::new(0),
        }
    }

    /// Last saved preferences.
    pub fn snapshot(&self) -> Option<Preferences> {
        self.prefs.lock().clone()
    }

    /// Number of times `save` was called.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn load(&self) -> BoxFuture<'_, SyncResult<Option<Preferences>>> {
        let prefs = self.prefs.lock().clone();
        Box::pin(async move { Ok(prefs) })
    }

    fn save<'a>(&'a self, prefs: &'a Preferences) -> BoxFuture<'a, SyncResult<()>> {
        *self.prefs.lock() = Some(prefs.clone());
        *self.saves.lock() += 1;
        Box::pin(async { Ok(()) })
    }
}
