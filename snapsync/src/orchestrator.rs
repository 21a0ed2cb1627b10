//! Public facade: sequences the lifecycle transitions and applies the
//! app-start and resume policy.
//!
//! # Startup policy
//!
//! ```text
//! cleanup stale ──► offline? ── yes ──► reload
//!                      │
//!                      no ──► method
//!                               ├── auto        sync(background) then reload
//!                               ├── none        reload
//!                               └── background  reload, then sync in a spawned task
//! ```
//!
//! The background sync is handed back to the caller as a [`BackgroundSync`]
//! so its outcome can be awaited; failures are also logged inside the task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{CurrentConfig, DeployConfig, InitialConfig};
use crate::download::{ProgressCallback, SchedulerConfig};
use crate::error::{SyncError, SyncResult};
use crate::lifecycle::{CheckForUpdateResponse, VersionLifecycleManager};
use crate::platform::{Collaborators, Connectivity, PlatformInfo};
use crate::preferences::{SnapshotInfo, UpdateMethod, UpdateState};

/// Per-call options for [`SyncOrchestrator::sync`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Overrides the persisted update method for this call only.
    pub update_method: Option<UpdateMethod>,
}

impl SyncOptions {
    /// Options forcing the given method.
    pub fn with_method(method: UpdateMethod) -> Self {
        Self {
            update_method: Some(method),
        }
    }
}

/// A sync running in its own task.
pub struct BackgroundSync {
    handle: JoinHandle<SyncResult<Option<SnapshotInfo>>>,
}

impl BackgroundSync {
    /// Wait for the sync to finish.
    pub async fn wait(self) -> SyncResult<Option<SnapshotInfo>> {
        self.handle
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }

    /// The underlying task handle.
    pub fn into_handle(self) -> JoinHandle<SyncResult<Option<SnapshotInfo>>> {
        self.handle
    }

    /// Whether the task has completed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// What the startup policy did.
pub struct StartupOutcome {
    /// A redirect to a different snapshot was issued.
    pub redirected: bool,
    /// Present when the background method spawned a sync.
    pub background: Option<BackgroundSync>,
}

/// The update engine's public surface.
#[derive(Clone)]
pub struct SyncOrchestrator {
    lifecycle: Arc<VersionLifecycleManager>,
    connectivity: Arc<dyn Connectivity>,
    paused_at: Arc<Mutex<Option<Instant>>>,
}

impl SyncOrchestrator {
    /// Build an engine from its collaborators.
    pub async fn new(
        initial: &InitialConfig,
        platform: PlatformInfo,
        collaborators: Collaborators,
    ) -> SyncResult<Self> {
        Self::with_scheduler(initial, platform, collaborators, SchedulerConfig::default()).await
    }

    /// Build an engine with custom download batching.
    pub async fn with_scheduler(
        initial: &InitialConfig,
        platform: PlatformInfo,
        collaborators: Collaborators,
        scheduler_config: SchedulerConfig,
    ) -> SyncResult<Self> {
        let lifecycle =
            VersionLifecycleManager::load(initial, platform, &collaborators, scheduler_config).await?;
        Ok(Self::from_lifecycle(Arc::new(lifecycle), collaborators.connectivity))
    }

    /// Wrap an existing lifecycle manager.
    pub fn from_lifecycle(
        lifecycle: Arc<VersionLifecycleManager>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            lifecycle,
            connectivity,
            paused_at: Arc::new(Mutex::new(None)),
        }
    }

    /// The lifecycle manager behind this facade.
    pub fn lifecycle(&self) -> &VersionLifecycleManager {
        &self.lifecycle
    }

    /// Validate and apply a runtime configuration override.
    pub async fn configure(&self, config: &DeployConfig) -> SyncResult<()> {
        self.lifecycle.configure(config).await
    }

    /// The effective configuration.
    pub fn get_configuration(&self) -> CurrentConfig {
        self.lifecycle.get_configuration()
    }

    /// Ask the update service whether a newer snapshot exists.
    pub async fn check_for_update(&self) -> SyncResult<CheckForUpdateResponse> {
        self.lifecycle.check_for_update().await
    }

    /// Assemble the snapshot directory for the available update.
    pub async fn download_update(&self, on_progress: Option<ProgressCallback>) -> SyncResult<bool> {
        self.lifecycle.download_update(on_progress).await
    }

    /// Register the downloaded snapshot as an installed version.
    pub async fn extract_update(&self, on_progress: Option<ProgressCallback>) -> SyncResult<bool> {
        self.lifecycle.extract_update(on_progress).await
    }

    /// Commit a ready update and point the webview at the current version.
    pub async fn reload_app(&self) -> SyncResult<bool> {
        self.lifecycle.reload_app().await
    }

    /// The committed current version.
    pub fn get_current_version(&self) -> Option<SnapshotInfo> {
        self.lifecycle.get_current_version()
    }

    /// An installed version by id.
    pub fn get_version_by_id(&self, version_id: &str) -> Option<SnapshotInfo> {
        self.lifecycle.get_version_by_id(version_id)
    }

    /// Every installed version, most recently used first.
    pub fn get_available_versions(&self) -> Vec<SnapshotInfo> {
        self.lifecycle.get_available_versions()
    }

    /// Delete one installed snapshot unless the webview is serving it.
    pub async fn delete_version_by_id(&self, version_id: &str) -> SyncResult<bool> {
        self.lifecycle.delete_version_by_id(version_id).await
    }

    /// Receiver that flips to `true` once the app may be shown.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.lifecycle.ready_signal()
    }

    /// Run the whole pipeline as far as the effective method allows.
    ///
    /// Must not run concurrently with itself.
    pub async fn sync(
        &self,
        options: SyncOptions,
        on_progress: Option<ProgressCallback>,
    ) -> SyncResult<Option<SnapshotInfo>> {
        let method = options
            .update_method
            .unwrap_or_else(|| self.lifecycle.preferences().update_method);
        debug!(method = %method, "Sync started");

        self.lifecycle.check_for_update().await?;

        if self.lifecycle.preferences().pending_in(UpdateState::Available) {
            self.lifecycle.download_update(on_progress.clone()).await?;
        }
        if self.lifecycle.preferences().pending_in(UpdateState::Pending) {
            self.lifecycle.extract_update(on_progress).await?;
        }
        if method == UpdateMethod::Auto && self.lifecycle.preferences().pending_in(UpdateState::Ready) {
            self.lifecycle.reload_app().await?;
        }

        Ok(self.lifecycle.get_current_version())
    }

    /// Apply the startup policy.
    pub async fn handle_initial_preference_state(&self) -> SyncResult<StartupOutcome> {
        if let Err(e) = self.lifecycle.cleanup_stale_versions().await {
            warn!(error = %e, "Stale snapshot cleanup failed");
        }

        if !self.connectivity.is_online() {
            info!("Offline, skipping update check");
            return self.reload_only().await;
        }

        match self.lifecycle.preferences().update_method {
            UpdateMethod::Auto => {
                if let Err(e) = self
                    .sync(SyncOptions::with_method(UpdateMethod::Background), None)
                    .await
                {
                    error!(error = %e, "Startup sync failed");
                }
                self.reload_only().await
            }
            UpdateMethod::None => self.reload_only().await,
            UpdateMethod::Background => {
                let redirected = self.lifecycle.reload_app().await?;
                let background = self.spawn_background_sync();
                Ok(StartupOutcome {
                    redirected,
                    background: Some(background),
                })
            }
        }
    }

    async fn reload_only(&self) -> SyncResult<StartupOutcome> {
        Ok(StartupOutcome {
            redirected: self.lifecycle.reload_app().await?,
            background: None,
        })
    }

    fn spawn_background_sync(&self) -> BackgroundSync {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let result = this
                .sync(SyncOptions::with_method(UpdateMethod::Background), None)
                .await;
            match &result {
                Ok(Some(current)) => debug!(version_id = %current.version_id, "Background sync finished"),
                Ok(None) => debug!("Background sync finished"),
                Err(e) => error!(error = %e, "Background sync failed"),
            }
            result
        });
        BackgroundSync { handle }
    }

    /// Record that the app went to the background.
    pub fn on_pause(&self) {
        *self.paused_at.lock() = Some(Instant::now());
    }

    /// Re-run the startup policy when the app was away long enough.
    pub async fn on_resume(&self) -> SyncResult<Option<StartupOutcome>> {
        let paused_at = self.paused_at.lock().take();
        let Some(paused_at) = paused_at else {
            return Ok(None);
        };

        let min = Duration::from_secs(self.lifecycle.preferences().min_background_duration);
        let away = paused_at.elapsed();
        if away < min {
            debug!(away_secs = away.as_secs(), "Resumed too soon, skipping update flow");
            return Ok(None);
        }

        info!(away_secs = away.as_secs(), "Resumed after background, re-running update flow");
        self.handle_initial_preference_state().await.map(Some)
    }
}
