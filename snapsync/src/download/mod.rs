//! Batched snapshot file downloads.
//!
//! This module provides:
//! - Progress percentage calculation and callbacks (`progress`)
//! - Resolving manifest hrefs against the manifest's final URL (`url`)
//! - Sequential batches of concurrent transfers (`scheduler`)
//!
//! # Architecture
//!
//! ```text
//! DownloadScheduler
//!         │
//!         ├── resolve_file_url (href + base URL query string)
//!         │
//!         ├── FileManager::download_file (up to 20 per batch, joined)
//!         │
//!         └── ProgressTracker (bytes → percentage → callback)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use snapsync::download::{DownloadScheduler, SchedulerConfig};
//!
//! let scheduler = DownloadScheduler::new(files, platform, SchedulerConfig::default());
//! let report = scheduler
//!     .run(&base_url, &diff.to_download, "v2", diff.bytes_already_satisfied, total, None)
//!     .await?;
//! println!("{} files in {} batches", report.files, report.batches);
//! ```

mod progress;
mod scheduler;
mod url;

pub use progress::{percent, ProgressCallback, ProgressTracker};
pub use scheduler::{DownloadReport, DownloadScheduler, SchedulerConfig};
pub use url::resolve_file_url;
