//! snapsync - Over-the-air snapshot updates for locally served app bundles
//!
//! This library checks a remote service for a newer snapshot of an app's web
//! assets, downloads only the files that changed, assembles a complete
//! snapshot directory next to the previous ones and switches the host's
//! webview over to it.
//!
//! # Layout
//!
//! ```text
//! SyncOrchestrator (orchestrator)       startup/resume policy, public facade
//!         │
//! VersionLifecycleManager (lifecycle)   Available → Pending → Ready → current, eviction
//!         │
//!         ├── ManifestFetcher (manifest)
//!         ├── DiffEngine (diff)
//!         └── DownloadScheduler (download)
//!                 │
//! platform + http                       collaborator traits and local implementations
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use snapsync::{Collaborators, InitialConfig, PlatformInfo, SyncOrchestrator};
//!
//! let engine = SyncOrchestrator::new(&initial, platform, collaborators).await?;
//! let outcome = engine.handle_initial_preference_state().await?;
//! if let Some(background) = outcome.background {
//!     background.wait().await?;
//! }
//! ```

pub mod config;
pub mod diff;
pub mod download;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod platform;
pub mod preferences;

#[cfg(test)]
mod testing;

pub use config::{CurrentConfig, DeployConfig, InitialConfig};
pub use diff::{DiffEngine, DiffResult};
pub use download::{DownloadReport, DownloadScheduler, ProgressCallback, SchedulerConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use lifecycle::{CheckForUpdateResponse, VersionLifecycleManager};
pub use manifest::{FetchedManifest, ManifestEntry, ManifestFetcher};
pub use orchestrator::{BackgroundSync, StartupOutcome, SyncOptions, SyncOrchestrator};
pub use platform::{
    AlwaysOnline, Collaborators, Connectivity, FileManager, FileNavigation,
    JsonFilePreferencesStore, LocalFileManager, MemoryNavigation, MemoryPreferencesStore,
    NavigationControl, PlatformInfo, PreferencesStore, StaticConnectivity,
};
pub use preferences::{AvailableUpdate, Preferences, SnapshotInfo, UpdateMethod, UpdateState};
