//! Bounded-concurrency batch downloads.
//!
//! Entries are split into batches of at most `batch_size`. The transfers of a
//! batch run concurrently on the calling task; batches run strictly one after
//! another with a short pause in between, which keeps bursts from overwhelming
//! the transport.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use reqwest::Url;
use tracing::{debug, info};

use super::progress::{ProgressCallback, ProgressTracker};
use super::url::resolve_file_url;
use crate::error::SyncResult;
use crate::manifest::ManifestEntry;
use crate::platform::{FileManager, PlatformInfo};

/// Maximum transfers in flight per batch.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Pause between consecutive batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(50);

/// Batch sizing for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum concurrent transfers per batch (minimum 1).
    pub batch_size: usize,
    /// Delay between batches.
    pub batch_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Result of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Number of batches executed.
    pub batches: usize,
    /// Number of files downloaded.
    pub files: usize,
    /// Bytes accounted for at the end, including pre-satisfied bytes.
    pub bytes: u64,
}

/// Downloads snapshot files in sequential batches.
#[derive(Clone)]
pub struct DownloadScheduler {
    files: Arc<dyn FileManager>,
    platform: Arc<PlatformInfo>,
    config: SchedulerConfig,
}

impl DownloadScheduler {
    /// Create a scheduler writing into the platform's snapshot directories.
    pub fn new(
        files: Arc<dyn FileManager>,
        platform: Arc<PlatformInfo>,
        config: SchedulerConfig,
    ) -> Self {
        let config = SchedulerConfig {
            batch_size: config.batch_size.max(1),
            ..config
        };
        Self {
            files,
            platform,
            config,
        }
    }

    /// Number of batches needed for `entries` files.
    pub fn batch_count(&self, entries: usize) -> usize {
        entries.div_ceil(self.config.batch_size)
    }

    /// Download `entries` into the snapshot directory for `version_id`.
    ///
    /// Progress starts from `bytes_already_satisfied` and is reported after
    /// every completed file. The first failing file fails the run; files
    /// written before it stay on disk.
    pub async fn run(
        &self,
        base_url: &Url,
        entries: &[ManifestEntry],
        version_id: &str,
        bytes_already_satisfied: u64,
        total_size: u64,
        on_progress: Option<ProgressCallback>,
    ) -> SyncResult<DownloadReport> {
        let target_dir = self.platform.snapshot_dir(version_id);
        let tracker = ProgressTracker::new(bytes_already_satisfied, total_size, on_progress);
        let total_batches = self.batch_count(entries.len());

        info!(
            version_id,
            files = entries.len(),
            batches = total_batches,
            "Downloading snapshot files"
        );

        let mut batches = 0;
        for (index, batch) in entries.chunks(self.config.batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            debug!(batch = index + 1, of = total_batches, size = batch.len(), "Starting batch");

            let transfers = batch.iter().map(|entry| {
                let tracker = &tracker;
                let target = target_dir.join(entry.relative_path());
                async move {
                    let url = resolve_file_url(base_url, &entry.href)?;
                    self.files.download_file(url.as_str(), &target).await?;
                    tracker.add(entry.size);
                    Ok::<_, crate::error::SyncError>(())
                }
            });
            try_join_all(transfers).await?;
            batches += 1;
        }

        Ok(DownloadReport {
            batches,
            files: entries.len(),
            bytes: tracker.bytes(),
        })
    }
}
