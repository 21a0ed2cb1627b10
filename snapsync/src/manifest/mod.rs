//! Snapshot manifests: the list of files (path and size) making up a snapshot.
//!
//! # Format
//!
//! A manifest is a JSON array of `{"href": "...", "size": N}` objects. Order
//! is irrelevant. Two sources exist:
//!
//! - the remote manifest at an update's URL, fetched by [`ManifestFetcher`]
//! - the manifest stored next to a local snapshot (`pro-manifest.json`)
//!
//! # Equality
//!
//! Entries carry no content hash, so two entries are the same file exactly
//! when href and size match. A changed file with an unchanged size is treated
//! as unchanged.

mod fetcher;

use serde::{Deserialize, Serialize};

pub use fetcher::{FetchedManifest, ManifestFetcher};

use crate::error::{SyncError, SyncResult};

/// One file in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the snapshot root.
    pub href: String,
    /// Size in bytes.
    pub size: u64,
}

impl ManifestEntry {
    /// Create an entry.
    pub fn new(href: impl Into<String>, size: u64) -> Self {
        Self {
            href: href.into(),
            size,
        }
    }

    /// Href without a leading `/`, suitable for joining onto a directory.
    pub fn relative_path(&self) -> &str {
        self.href.trim_start_matches('/')
    }
}

/// Parse a manifest document.
pub fn parse_manifest(source_name: &str, body: &[u8]) -> SyncResult<Vec<ManifestEntry>> {
    serde_json::from_slice(body).map_err(|e| SyncError::ManifestParse {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })
}

/// Serialize a manifest document.
pub fn serialize_manifest(entries: &[ManifestEntry]) -> SyncResult<String> {
    serde_json::to_string(entries).map_err(|e| SyncError::ManifestParse {
        source_name: "<serialize>".to_string(),
        reason: e.to_string(),
    })
}

/// Sum of entry sizes.
pub fn total_size(entries: &[ManifestEntry]) -> u64 {
    entries.iter().map(|e| e.size).sum()
}
