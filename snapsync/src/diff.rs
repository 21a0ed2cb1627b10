//! Manifest diffing against a baseline and against files already on disk.
//!
//! # Algorithm
//!
//! ```text
//! new manifest ──► partition by (href, size) in baseline
//!                    ├── to_download            (not in baseline)
//!                    └── satisfied_by_baseline  (copied from the prior snapshot)
//!                         │
//!                         ▼
//!                  reconcile both against files under the snapshot dir
//!                  (left over from an interrupted download or copy)
//! ```
//!
//! The baseline is the previous version's manifest when one is known,
//! otherwise the manifest bundled with the binary. If no baseline can be
//! loaded the whole manifest is downloaded: a failed diff never blocks an
//! update.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::download::percent;
use crate::manifest::{ManifestEntry, ManifestFetcher};
use crate::platform::FileManager;

/// Outcome of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Entries that must be fetched from the network.
    pub to_download: Vec<ManifestEntry>,
    /// Entries unchanged since the baseline, to be copied from the prior snapshot.
    pub satisfied_by_baseline: Vec<ManifestEntry>,
    /// Bytes that need no download: baseline matches plus files already on disk.
    pub bytes_already_satisfied: u64,
    /// Size of the whole new manifest.
    pub total_size: u64,
}

impl DiffResult {
    /// Percentage of the snapshot satisfied before any download starts.
    pub fn percent_complete(&self) -> f64 {
        percent(self.bytes_already_satisfied, self.total_size)
    }

    /// Hrefs of the entries to copy from the prior snapshot.
    pub fn baseline_hrefs(&self) -> Vec<String> {
        self.satisfied_by_baseline
            .iter()
            .map(|e| e.relative_path().to_string())
            .collect()
    }
}

/// Computes the minimal download set for a new snapshot.
#[derive(Clone)]
pub struct DiffEngine {
    fetcher: ManifestFetcher,
    files: Arc<dyn FileManager>,
    bundled_manifest: PathBuf,
}

impl DiffEngine {
    /// Create a diff engine falling back to the manifest at `bundled_manifest`.
    pub fn new(
        fetcher: ManifestFetcher,
        files: Arc<dyn FileManager>,
        bundled_manifest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            files,
            bundled_manifest: bundled_manifest.into(),
        }
    }

    /// Diff `new_manifest` for the snapshot being assembled at `local_snapshot_path`.
    pub async fn diff(
        &self,
        new_manifest: &[ManifestEntry],
        baseline: Option<&[ManifestEntry]>,
        local_snapshot_path: &Path,
        total_size: u64,
    ) -> DiffResult {
        let bundled;
        let baseline = match baseline {
            Some(baseline) => baseline,
            None => match self.fetcher.load_local(&self.bundled_manifest).await {
                Ok(entries) => {
                    bundled = entries;
                    &bundled
                }
                Err(e) => {
                    warn!(error = %e, "No baseline manifest available, downloading everything");
                    return DiffResult {
                        to_download: new_manifest.to_vec(),
                        satisfied_by_baseline: Vec::new(),
                        bytes_already_satisfied: 0,
                        total_size,
                    };
                }
            },
        };

        let mut result = partition(new_manifest, baseline);
        result.total_size = total_size;

        let on_disk = match self.files.list_files_recursive(local_snapshot_path).await {
            Ok(files) => files.into_iter().collect::<HashSet<_>>(),
            Err(e) => {
                debug!(
                    path = %local_snapshot_path.display(),
                    error = %e,
                    "Snapshot directory not listable, assuming empty"
                );
                HashSet::new()
            }
        };
        reconcile(&mut result, &on_disk);

        debug!(
            to_download = result.to_download.len(),
            from_baseline = result.satisfied_by_baseline.len(),
            bytes_satisfied = result.bytes_already_satisfied,
            total_size,
            "Manifest diff complete"
        );

        result
    }
}

/// Split `new_manifest` by structural membership in `baseline`.
fn partition(new_manifest: &[ManifestEntry], baseline: &[ManifestEntry]) -> DiffResult {
    let known: HashSet<&ManifestEntry> = baseline.iter().collect();
    let (satisfied, to_download): (Vec<_>, Vec<_>) = new_manifest
        .iter()
        .cloned()
        .partition(|entry| known.contains(entry));

    let bytes = satisfied.iter().map(|e| e.size).sum();
    DiffResult {
        to_download,
        satisfied_by_baseline: satisfied,
        bytes_already_satisfied: bytes,
        total_size: 0,
    }
}

/// Drop entries whose files already exist on disk.
///
/// Baseline entries were already counted as satisfied; only download entries
/// found on disk add to the satisfied byte count.
fn reconcile(result: &mut DiffResult, on_disk: &HashSet<String>) {
    if on_disk.is_empty() {
        return;
    }

    let mut recovered = 0u64;
    result.to_download.retain(|entry| {
        if on_disk.contains(entry.relative_path()) {
            recovered += entry.size;
            false
        } else {
            true
        }
    });
    result
        .satisfied_by_baseline
        .retain(|entry| !on_disk.contains(entry.relative_path()));
    result.bytes_already_satisfied += recovered;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::manifest::total_size;
    use crate::platform::LocalFileManager;
    use proptest::prelude::*;

    fn engine(bundled_manifest: &Path) -> DiffEngine {
        let files: Arc<dyn FileManager> = Arc::new(LocalFileManager::new());
        let fetcher = ManifestFetcher::new(Arc::new(MockHttpClient::new()), Arc::clone(&files));
        DiffEngine::new(fetcher, files, bundled_manifest)
    }

    fn manifest() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry::new("index.html", 100),
            ManifestEntry::new("js/app.js", 2000),
            ManifestEntry::new("css/site.css", 300),
        ]
    }

    #[tokio::test]
    async fn test_empty_baseline_downloads_everything() {
        let temp = tempfile::tempdir().unwrap();
        let m = manifest();

        let result = engine(&temp.path().join("none.json"))
            .diff(&m, Some(&[][..]), &temp.path().join("v1"), total_size(&m))
            .await;

        assert_eq!(result.to_download, m);
        assert!(result.satisfied_by_baseline.is_empty());
        assert_eq!(result.bytes_already_satisfied, 0);
        assert_eq!(result.percent_complete(), 0.0);
    }

    #[tokio::test]
    async fn test_identical_baseline_downloads_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let m = manifest();

        let result = engine(&temp.path().join("none.json"))
            .diff(&m, Some(m.as_slice()), &temp.path().join("v1"), total_size(&m))
            .await;

        assert!(result.to_download.is_empty());
        assert_eq!(result.satisfied_by_baseline, m);
        assert_eq!(result.bytes_already_satisfied, 2400);
        assert_eq!(result.percent_complete(), 100.0);
    }

    #[tokio::test]
    async fn test_size_change_counts_as_changed() {
        let temp = tempfile::tempdir().unwrap();
        let m = manifest();
        let mut baseline = m.clone();
        baseline[1].size = 1999;

        let result = engine(&temp.path().join("none.json"))
            .diff(&m, Some(baseline.as_slice()), &temp.path().join("v1"), total_size(&m))
            .await;

        assert_eq!(result.to_download, vec![ManifestEntry::new("js/app.js", 2000)]);
        assert_eq!(result.bytes_already_satisfied, 400);
    }

    #[tokio::test]
    async fn test_falls_back_to_bundled_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let bundled = temp.path().join("pro-manifest.json");
        std::fs::write(&bundled, r#"[{"href":"index.html","size":100}]"#).unwrap();
        let m = manifest();

        let result = engine(&bundled)
            .diff(&m, None, &temp.path().join("v1"), total_size(&m))
            .await;

        assert_eq!(
            result.satisfied_by_baseline,
            vec![ManifestEntry::new("index.html", 100)]
        );
        assert_eq!(result.to_download.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_bundled_manifest_downloads_everything() {
        let temp = tempfile::tempdir().unwrap();
        let snapshot = temp.path().join("v1");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("index.html"), "x").unwrap();
        let m = manifest();

        let result = engine(&temp.path().join("missing.json"))
            .diff(&m, None, &snapshot, total_size(&m))
            .await;

        assert_eq!(result.to_download, m);
        assert_eq!(result.bytes_already_satisfied, 0);
    }

    #[tokio::test]
    async fn test_reconciles_files_already_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let snapshot = temp.path().join("v1");
        std::fs::create_dir_all(snapshot.join("js")).unwrap();
        std::fs::write(snapshot.join("js/app.js"), "partial run").unwrap();
        std::fs::write(snapshot.join("index.html"), "copied").unwrap();

        let m = manifest();
        let baseline = vec![ManifestEntry::new("index.html", 100)];

        let result = engine(&temp.path().join("none.json"))
            .diff(&m, Some(baseline.as_slice()), &snapshot, total_size(&m))
            .await;

        assert_eq!(result.to_download, vec![ManifestEntry::new("css/site.css", 300)]);
        assert!(result.satisfied_by_baseline.is_empty());
        // index.html counted once via baseline, js/app.js recovered from disk
        assert_eq!(result.bytes_already_satisfied, 2100);
        assert_eq!(result.percent_complete(), 87.5);
    }

    #[tokio::test]
    async fn test_extensionless_file_on_disk_is_not_reconciled() {
        let temp = tempfile::tempdir().unwrap();
        let snapshot = temp.path().join("v1");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("LICENSE"), "mit").unwrap();

        let m = vec![ManifestEntry::new("LICENSE", 3)];
        let result = engine(&temp.path().join("none.json"))
            .diff(&m, Some(&[][..]), &snapshot, 3)
            .await;

        assert_eq!(result.to_download, m);
    }

    #[test]
    fn test_leading_slash_hrefs_reconcile() {
        let mut result = partition(&[ManifestEntry::new("/a.js", 7)], &[]);
        let on_disk: HashSet<String> = ["a.js".to_string()].into_iter().collect();
        reconcile(&mut result, &on_disk);
        assert!(result.to_download.is_empty());
        assert_eq!(result.bytes_already_satisfied, 7);
    }

    fn arb_manifest() -> impl Strategy<Value = Vec<ManifestEntry>> {
        prop::collection::hash_set(("[a-z]{1,6}\\.js", 0u64..10_000), 0..40).prop_map(|set| {
            set.into_iter()
                .map(|(href, size)| ManifestEntry::new(href, size))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_partition_covers_manifest(
            new in arb_manifest(),
            baseline in arb_manifest(),
        ) {
            let result = partition(&new, &baseline);
            prop_assert_eq!(
                result.to_download.len() + result.satisfied_by_baseline.len(),
                new.len()
            );
            prop_assert_eq!(
                result.bytes_already_satisfied,
                total_size(&result.satisfied_by_baseline)
            );
            for entry in &result.satisfied_by_baseline {
                prop_assert!(baseline.contains(entry));
            }
            for entry in &result.to_download {
                prop_assert!(!baseline.contains(entry));
            }
        }

        #[test]
        fn prop_reconcile_never_exceeds_total(
            new in arb_manifest(),
            baseline in arb_manifest(),
            disk_picks in prop::collection::vec(any::<bool>(), 40),
        ) {
            let mut result = partition(&new, &baseline);
            let on_disk: HashSet<String> = new
                .iter()
                .zip(disk_picks.iter())
                .filter(|(_, pick)| **pick)
                .map(|(e, _)| e.href.clone())
                .collect();
            reconcile(&mut result, &on_disk);

            let remaining = total_size(&result.to_download);
            prop_assert_eq!(result.bytes_already_satisfied + remaining, total_size(&new));
        }
    }
}
