//! Snapshot lifecycle: the pending-update state machine and the registry of
//! installed versions.
//!
//! # State Machine
//!
//! ```text
//!   check_for_update        download_update        extract_update       reload_app
//!  ─────────────────► Available ──────────► Pending ──────────► Ready ──────────► current
//!                                                                 (available_update cleared)
//! ```
//!
//! Each transition checks its precondition and is a no-op returning
//! `Ok(false)` when it does not hold. Failed downloads leave the state where
//! it was, so the next run resumes from the files already on disk.
//!
//! # Preferences
//!
//! The manager owns the only in-memory copy of the preferences. Every
//! mutation takes the lock, edits, clones, releases, and then flushes the
//! whole blob to the store. The lock is never held across an await.

mod check;
mod eviction;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use check::{
    check_device, check_endpoint, parse_check_response, CheckDeviceRequest,
    CheckForUpdateResponse, DeviceInfo,
};
pub use eviction::{excess_versions, stale_versions};

use crate::config::{CurrentConfig, DeployConfig, InitialConfig, CHECK_TIMEOUT};
use crate::diff::DiffEngine;
use crate::download::{DownloadScheduler, ProgressCallback, SchedulerConfig};
use crate::error::SyncResult;
use crate::http::HttpClient;
use crate::manifest::{serialize_manifest, total_size, ManifestFetcher};
use crate::platform::{
    Collaborators, FileManager, NavigationControl, PlatformInfo, PreferencesStore,
    BASE_VERSION_ID,
};
use crate::preferences::{Preferences, SnapshotInfo, UpdateState};

/// Owns the session preferences and drives every snapshot transition.
pub struct VersionLifecycleManager {
    prefs: Mutex<Preferences>,
    store: Arc<dyn PreferencesStore>,
    files: Arc<dyn FileManager>,
    navigation: Arc<dyn NavigationControl>,
    http: Arc<dyn HttpClient>,
    platform: Arc<PlatformInfo>,
    fetcher: ManifestFetcher,
    diff: DiffEngine,
    scheduler: DownloadScheduler,
    check_timeout: Duration,
    ready: watch::Sender<bool>,
}

impl VersionLifecycleManager {
    /// Load the preferences and wire up the pipeline.
    ///
    /// First run (or an unreadable blob) starts from `initial`. The running
    /// binary identity always comes from `initial`, and the result is saved
    /// before returning.
    pub async fn load(
        initial: &InitialConfig,
        platform: PlatformInfo,
        collaborators: &Collaborators,
        scheduler_config: SchedulerConfig,
    ) -> SyncResult<Self> {
        let mut prefs = match collaborators.store.load().await {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                info!(app_id = %initial.app_id, "No saved preferences, starting fresh");
                Preferences::from_initial(initial)
            }
            Err(e) => {
                warn!(error = %e, "Saved preferences unreadable, starting fresh");
                Preferences::from_initial(initial)
            }
        };
        prefs.binary_version_name = initial.binary_version_name.clone();
        prefs.binary_version_code = initial.binary_version_code.clone();
        collaborators.store.save(&prefs).await?;

        let platform = Arc::new(platform);
        let files = Arc::clone(&collaborators.files);
        let fetcher = ManifestFetcher::new(Arc::clone(&collaborators.http), Arc::clone(&files));
        let diff = DiffEngine::new(
            fetcher.clone(),
            Arc::clone(&files),
            platform.bundled_manifest_path(),
        );
        let scheduler = DownloadScheduler::new(Arc::clone(&files), Arc::clone(&platform), scheduler_config);
        let (ready, _) = watch::channel(false);

        Ok(Self {
            prefs: Mutex::new(prefs),
            store: Arc::clone(&collaborators.store),
            files,
            navigation: Arc::clone(&collaborators.navigation),
            http: Arc::clone(&collaborators.http),
            platform,
            fetcher,
            diff,
            scheduler,
            check_timeout: CHECK_TIMEOUT,
            ready,
        })
    }

    /// Override the update check timeout.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// A copy of the current preferences.
    pub fn preferences(&self) -> Preferences {
        self.prefs.lock().clone()
    }

    /// The platform descriptor in use.
    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// Receiver that flips to `true` once the app is cleared to show.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Mutate the preferences and flush the result.
    async fn update_prefs<R>(&self, f: impl FnOnce(&mut Preferences) -> R) -> SyncResult<R> {
        let (result, snapshot) = {
            let mut prefs = self.prefs.lock();
            let result = f(&mut prefs);
            (result, prefs.clone())
        };
        self.store.save(&snapshot).await?;
        Ok(result)
    }

    // ---- configuration ----

    /// Validate and apply a runtime override.
    pub async fn configure(&self, config: &DeployConfig) -> SyncResult<()> {
        config.validate()?;
        self.update_prefs(|p| config.apply(p)).await?;
        info!("Configuration updated");
        Ok(())
    }

    /// The effective configuration.
    pub fn get_configuration(&self) -> CurrentConfig {
        CurrentConfig::from(&*self.prefs.lock())
    }

    // ---- transitions ----

    /// Ask the update service whether a newer snapshot exists.
    pub async fn check_for_update(&self) -> SyncResult<CheckForUpdateResponse> {
        let prefs = self.preferences();
        if prefs.disabled {
            info!("Update checks disabled");
            return Ok(CheckForUpdateResponse::unavailable());
        }

        let request = CheckDeviceRequest::new(&prefs, &self.platform);
        let endpoint = check_endpoint(&prefs.host, &prefs.app_id);
        let response = check_device(Arc::clone(&self.http), endpoint, &request, self.check_timeout).await?;

        match response.to_available_update(&prefs, Utc::now()) {
            Some(update) => {
                info!(version_id = %update.version_id, build_id = %update.build_id, "Update available");
                self.update_prefs(|p| {
                    let installed = p.current_version_id.as_deref() == Some(update.version_id.as_str())
                        && p.current_build_id.as_deref() == Some(update.build_id.as_str());
                    if installed {
                        return;
                    }
                    // A downloaded update keeps its state; only the signed URL is refreshed.
                    let downloaded = p.available_update.as_ref().is_some_and(|u| {
                        u.version_id == update.version_id
                            && u.build_id == update.build_id
                            && u.state != UpdateState::Available
                    });
                    if !downloaded {
                        p.available_update = Some(update);
                    } else if let Some(u) = p.available_update.as_mut() {
                        u.url = update.url;
                    }
                })
                .await?;
            }
            None if response.incompatible_update_available() => {
                info!("Update available for a different binary version");
            }
            None => debug!("No update available"),
        }

        Ok(response)
    }

    /// Assemble the snapshot directory for the available update.
    pub async fn download_update(&self, on_progress: Option<ProgressCallback>) -> SyncResult<bool> {
        let prefs = self.preferences();
        let update = match &prefs.available_update {
            Some(update) if update.state == UpdateState::Available => update.clone(),
            _ => {
                debug!(state = ?prefs.pending_state(), "No available update to download");
                return Ok(false);
            }
        };
        let version_id = update.version_id.as_str();

        let manifest = self.fetcher.fetch(&update.url, version_id).await?;
        let total = total_size(&manifest.entries);

        let (prior_id, baseline) = match prefs.current_version_id.as_deref() {
            Some(current) if prefs.updates.contains_key(current) => {
                match self.fetcher.load_local(&self.platform.manifest_path(current)).await {
                    Ok(entries) => (current.to_string(), Some(entries)),
                    Err(e) => {
                        warn!(version_id = current, error = %e, "Current manifest unreadable, diffing against base");
                        (BASE_VERSION_ID.to_string(), None)
                    }
                }
            }
            _ => (BASE_VERSION_ID.to_string(), None),
        };

        let snapshot_dir = self.platform.snapshot_dir(version_id);
        let diff = self
            .diff
            .diff(&manifest.entries, baseline.as_deref(), &snapshot_dir, total)
            .await;
        if let Some(cb) = &on_progress {
            cb(diff.percent_complete());
        }

        self.copy_plugin_resources(&snapshot_dir).await?;
        let hrefs = diff.baseline_hrefs();
        if !hrefs.is_empty() {
            debug!(from = %prior_id, files = hrefs.len(), "Copying unchanged files");
            self.files
                .copy_files(&self.platform.snapshot_dir(&prior_id), &snapshot_dir, &hrefs)
                .await?;
        }

        self.scheduler
            .run(
                &manifest.base_url,
                &diff.to_download,
                version_id,
                diff.bytes_already_satisfied,
                total,
                on_progress,
            )
            .await?;

        let json = serialize_manifest(&manifest.entries)?;
        self.files
            .write_string(&self.platform.manifest_path(version_id), &json)
            .await?;

        let advanced = self
            .update_prefs(|p| match p.available_update.as_mut() {
                Some(u) if u.version_id == version_id && u.state == UpdateState::Available => {
                    u.state = UpdateState::Pending;
                    true
                }
                _ => false,
            })
            .await?;
        if advanced {
            info!(version_id, "Snapshot downloaded");
        }
        Ok(advanced)
    }

    /// Copy the binary's plugin resources that exist into `snapshot_dir`.
    async fn copy_plugin_resources(&self, snapshot_dir: &Path) -> SyncResult<()> {
        let bundled = &self.platform.bundled_dir;
        let present: HashSet<String> = match self.files.list_dir(bundled).await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                warn!(path = %bundled.display(), error = %e, "Bundled directory not listable, skipping plugin resources");
                return Ok(());
            }
        };

        for resource in &self.platform.plugin_resources {
            let top = resource.split('/').next().unwrap_or(resource);
            if !present.contains(top) {
                continue;
            }
            self.files
                .copy_tree(&bundled.join(resource), &snapshot_dir.join(resource))
                .await?;
        }
        Ok(())
    }

    /// Register the downloaded snapshot as an installed version.
    pub async fn extract_update(&self, on_progress: Option<ProgressCallback>) -> SyncResult<bool> {
        let extracted = self
            .update_prefs(|p| {
                let Some(update) = p.available_update.as_mut() else {
                    return None;
                };
                if update.state != UpdateState::Pending {
                    return None;
                }
                update.state = UpdateState::Ready;
                let installed = update.clone();
                let id = installed.version_id.clone();
                p.updates.insert(id.clone(), installed);
                Some(id)
            })
            .await?;

        match extracted {
            Some(version_id) => {
                if let Some(cb) = &on_progress {
                    cb(100.0);
                }
                info!(version_id = %version_id, "Snapshot ready");
                Ok(true)
            }
            None => {
                debug!("No pending update to extract");
                Ok(false)
            }
        }
    }

    /// Commit a ready update and point the webview at the current version.
    ///
    /// Returns `true` only when a redirect was issued.
    pub async fn reload_app(&self) -> SyncResult<bool> {
        if self.preferences().pending_in(UpdateState::Ready) {
            self.update_prefs(|p| {
                if let Some(update) = p.available_update.take() {
                    info!(version_id = %update.version_id, "Committing update");
                    p.current_version_id = Some(update.version_id);
                    p.current_build_id = Some(update.build_id);
                }
            })
            .await?;
        }

        let prefs = self.preferences();
        let Some(current) = prefs.current_version_id.clone() else {
            debug!("No current version, serving bundled app");
            self.mark_ready();
            return Ok(false);
        };

        let active = self.navigation.active_base_path().await?;
        if self.platform.is_serving(&active, &current) {
            debug!(version_id = %current, "Already serving current version");
            self.mark_ready();
            self.navigation.persist_base_path().await?;
            self.cleanup_versions().await?;
            return Ok(false);
        }

        if !prefs.updates.contains_key(&current) {
            error!(version_id = %current, "Current version is not installed, not redirecting");
            self.mark_ready();
            return Ok(false);
        }

        self.update_prefs(|p| {
            if let Some(update) = p.updates.get_mut(&current) {
                update.last_used = Utc::now();
            }
        })
        .await?;

        let dir = self.platform.snapshot_dir(&current);
        info!(version_id = %current, path = %dir.display(), "Redirecting to snapshot");
        self.navigation.set_active_base_path(&dir).await?;
        Ok(true)
    }

    // ---- eviction ----

    /// Delete snapshots built for a different binary. Returns the removed ids.
    pub async fn cleanup_stale_versions(&self) -> SyncResult<Vec<String>> {
        let active = self.navigation.active_base_path().await?;
        let stale = stale_versions(&self.preferences(), |id| self.platform.is_serving(&active, id));
        for version_id in &stale {
            info!(version_id = %version_id, "Removing snapshot for another binary");
            self.remove_version(version_id).await?;
        }
        Ok(stale)
    }

    /// Stale cleanup, then trim history to `max_versions`. Returns the removed ids.
    pub async fn cleanup_versions(&self) -> SyncResult<Vec<String>> {
        let mut removed = self.cleanup_stale_versions().await?;

        let active = self.navigation.active_base_path().await?;
        let excess = excess_versions(&self.preferences(), |id| self.platform.is_serving(&active, id));
        for version_id in excess {
            info!(version_id = %version_id, "Removing old snapshot");
            self.remove_version(&version_id).await?;
            removed.push(version_id);
        }
        Ok(removed)
    }

    /// Delete one installed snapshot unless the webview is serving it.
    pub async fn delete_version_by_id(&self, version_id: &str) -> SyncResult<bool> {
        if version_id == BASE_VERSION_ID {
            warn!("Refusing to delete the bundled app");
            return Ok(false);
        }
        let active = self.navigation.active_base_path().await?;
        if self.platform.is_serving(&active, version_id) {
            warn!(version_id, "Refusing to delete the running version");
            return Ok(false);
        }
        self.remove_version(version_id).await?;
        info!(version_id, "Snapshot deleted");
        Ok(true)
    }

    async fn remove_version(&self, version_id: &str) -> SyncResult<()> {
        self.files.remove(&self.platform.snapshot_dir(version_id)).await?;
        self.update_prefs(|p| {
            p.updates.remove(version_id);
            if p.current_version_id.as_deref() == Some(version_id) {
                p.current_version_id = None;
                p.current_build_id = None;
            }
        })
        .await
    }

    // ---- queries ----

    /// The committed current version.
    pub fn get_current_version(&self) -> Option<SnapshotInfo> {
        self.prefs.lock().current_update().map(SnapshotInfo::from)
    }

    /// An installed version by id.
    pub fn get_version_by_id(&self, version_id: &str) -> Option<SnapshotInfo> {
        self.prefs.lock().updates.get(version_id).map(SnapshotInfo::from)
    }

    /// Every installed version, most recently used first.
    pub fn get_available_versions(&self) -> Vec<SnapshotInfo> {
        let prefs = self.prefs.lock();
        let mut updates: Vec<_> = prefs.updates.values().collect();
        updates.sort_by(|a, b| {
            b.last_used
                .cmp(&a.last_used)
                .then_with(|| a.version_id.cmp(&b.version_id))
        });
        updates.into_iter().map(SnapshotInfo::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::platform::{AlwaysOnline, MemoryNavigation, MemoryPreferencesStore};
    use crate::preferences::tests::update;
    use crate::preferences::AvailableUpdate;
    use crate::testing::RecordingFileManager;

    const HOST: &str = "https://api.example.com";
    const CHECK_URL: &str = "https://api.example.com/apps/app-1/channels/check-device";
    const MANIFEST_URL: &str = "https://cdn.example.com/v2/pro-manifest.json?sig=1";

    struct Fixture {
        _temp: tempfile::TempDir,
        bundled: PathBuf,
        snapshots: PathBuf,
        http: Arc<MockHttpClient>,
        files: Arc<RecordingFileManager>,
        store: Arc<MemoryPreferencesStore>,
        navigation: Arc<MemoryNavigation>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_store(MemoryPreferencesStore::new())
        }

        fn with_store(store: MemoryPreferencesStore) -> Self {
            let temp = tempfile::tempdir().unwrap();
            let bundled = temp.path().join("www");
            let snapshots = temp.path().join("snapshots");
            std::fs::create_dir_all(bundled.join("plugins/camera")).unwrap();
            std::fs::write(bundled.join("cordova.js"), "cordova").unwrap();
            std::fs::write(bundled.join("plugins/camera/camera.js"), "cam").unwrap();
            std::fs::write(bundled.join("index.html"), "base index").unwrap();
            std::fs::write(
                bundled.join("pro-manifest.json"),
                r#"[{"href":"index.html","size":10}]"#,
            )
            .unwrap();

            Self {
                navigation: Arc::new(MemoryNavigation::new(bundled.clone())),
                _temp: temp,
                bundled,
                snapshots,
                http: Arc::new(MockHttpClient::new()),
                files: Arc::new(RecordingFileManager::new()),
                store: Arc::new(store),
            }
        }

        async fn manager(&self) -> VersionLifecycleManager {
            let collaborators = Collaborators {
                http: self.http.clone(),
                files: self.files.clone(),
                store: self.store.clone(),
                navigation: self.navigation.clone(),
                connectivity: Arc::new(AlwaysOnline),
            };
            let initial = InitialConfig::new("app-1", "1.0.0", "2").with_host(HOST);
            let platform = PlatformInfo::new("test", &self.bundled, &self.snapshots);
            let config = SchedulerConfig {
                batch_delay: Duration::ZERO,
                ..SchedulerConfig::default()
            };
            VersionLifecycleManager::load(&initial, platform, &collaborators, config)
                .await
                .unwrap()
        }

        fn announce(&self, version: &str) {
            self.announce_at(version, MANIFEST_URL);
        }

        fn announce_at(&self, version: &str, manifest_url: &str) {
            self.http.route(
                CHECK_URL,
                CHECK_URL,
                200,
                &format!(
                    r#"{{"data":{{"available":true,"compatible":true,"partial":false,"url":"{}","snapshot":"{}","build":"b-{}"}}}}"#,
                    manifest_url, version, version
                ),
            );
        }

        fn serve_manifest(&self, body: &str) {
            self.http.route(MANIFEST_URL, MANIFEST_URL, 200, body);
        }
    }

    fn pending(version: &str, state: UpdateState) -> AvailableUpdate {
        AvailableUpdate {
            state,
            ..update(version, "2", Utc::now())
        }
    }

    fn seeded(updates: &[AvailableUpdate], current: Option<&str>) -> MemoryPreferencesStore {
        let mut prefs = Preferences::from_initial(&InitialConfig::new("app-1", "1.0.0", "2").with_host(HOST));
        for u in updates {
            prefs.updates.insert(u.version_id.clone(), u.clone());
        }
        if let Some(id) = current {
            prefs.current_version_id = Some(id.to_string());
            prefs.current_build_id = Some(format!("build-{}", id));
        }
        MemoryPreferencesStore::with_preferences(prefs)
    }

    #[tokio::test]
    async fn test_load_refreshes_binary_identity() {
        let mut prefs = Preferences::from_initial(&InitialConfig::new("app-1", "0.9.0", "1"));
        prefs.channel = "Beta".to_string();
        let fixture = Fixture::with_store(MemoryPreferencesStore::with_preferences(prefs));

        let manager = fixture.manager().await;
        let prefs = manager.preferences();

        assert_eq!(prefs.binary_version_name, "1.0.0");
        assert_eq!(prefs.binary_version_code, "2");
        assert_eq!(prefs.channel, "Beta");
        assert_eq!(fixture.store.snapshot().unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_check_records_available_update() {
        let fixture = Fixture::new();
        fixture.announce("v2");
        let manager = fixture.manager().await;

        let response = manager.check_for_update().await.unwrap();

        assert!(response.available);
        let stored = fixture.store.snapshot().unwrap().available_update.unwrap();
        assert_eq!(stored.version_id, "v2");
        assert_eq!(stored.build_id, "b-v2");
        assert_eq!(stored.state, UpdateState::Available);
        assert_eq!(stored.url, MANIFEST_URL);
    }

    #[tokio::test]
    async fn test_check_disabled_skips_network() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;
        manager
            .configure(&DeployConfig::new().with_disabled(true))
            .await
            .unwrap();

        let response = manager.check_for_update().await.unwrap();

        assert!(!response.available);
        assert_eq!(fixture.http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_check_keeps_progress_of_same_update() {
        let fixture = Fixture::with_store(seeded(&[], None));
        fixture.announce("v2");
        let manager = fixture.manager().await;
        let in_flight = AvailableUpdate {
            build_id: "b-v2".to_string(),
            ..pending("v2", UpdateState::Pending)
        };
        manager
            .update_prefs(|p| p.available_update = Some(in_flight))
            .await
            .unwrap();

        manager.check_for_update().await.unwrap();

        let prefs = manager.preferences();
        assert!(prefs.pending_in(UpdateState::Pending));
        assert_eq!(prefs.available_update.unwrap().url, MANIFEST_URL);
    }

    #[tokio::test]
    async fn test_check_refreshes_url_of_undownloaded_update() {
        let expired = "https://cdn.example.com/v2/pro-manifest.json?sig=EXPIRED";
        let fixture = Fixture::new();
        fixture.announce_at("v2", expired);
        let manager = fixture.manager().await;
        manager.check_for_update().await.unwrap();

        // Nothing is served at the expired URL.
        assert!(manager.download_update(None).await.is_err());
        assert!(manager.preferences().pending_in(UpdateState::Available));

        fixture.announce("v2");
        fixture.serve_manifest(r#"[{"href":"js/app.js","size":30}]"#);
        manager.check_for_update().await.unwrap();

        let stored = manager.preferences().available_update.unwrap();
        assert_eq!(stored.url, MANIFEST_URL);
        assert_eq!(stored.state, UpdateState::Available);
        assert!(manager.download_update(None).await.unwrap());
        assert!(manager.preferences().pending_in(UpdateState::Pending));
    }

    #[tokio::test]
    async fn test_check_error_status_message() {
        let fixture = Fixture::new();
        fixture
            .http
            .route(CHECK_URL, CHECK_URL, 403, r#"{"error":{"message":"Forbidden app"}}"#);
        let manager = fixture.manager().await;

        let err = manager.check_for_update().await.unwrap_err();

        assert_eq!(err.to_string(), "Error Status 403: Forbidden app");
        assert!(manager.preferences().available_update.is_none());
    }

    #[tokio::test]
    async fn test_download_without_available_is_noop() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;

        assert!(!manager.download_update(None).await.unwrap());
        assert_eq!(fixture.http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_download_assembles_snapshot_from_base() {
        let fixture = Fixture::new();
        fixture.announce("v2");
        fixture.serve_manifest(
            r#"[{"href":"index.html","size":10},{"href":"js/app.js","size":30}]"#,
        );
        let manager = fixture.manager().await;
        manager.check_for_update().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |p: f64| sink.lock().push(p));
        assert!(manager.download_update(Some(cb)).await.unwrap());

        let dir = fixture.snapshots.join("v2");
        assert_eq!(std::fs::read_to_string(dir.join("index.html")).unwrap(), "base index");
        assert!(dir.join("js/app.js").exists());
        assert!(dir.join("cordova.js").exists());
        assert!(dir.join("plugins/camera/camera.js").exists());
        assert!(dir.join("pro-manifest.json").exists());

        let downloads = fixture.files.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0, "https://cdn.example.com/v2/js/app.js?sig=1");

        assert_eq!(*seen.lock(), vec![25.0, 100.0]);
        assert!(manager.preferences().pending_in(UpdateState::Pending));
    }

    #[tokio::test]
    async fn test_download_failure_leaves_state_available() {
        let fixture = Fixture::new();
        fixture.announce("v2");
        fixture.serve_manifest(r#"[{"href":"js/app.js","size":30}]"#);
        fixture.files.fail_downloads_matching("app.js");
        let manager = fixture.manager().await;
        manager.check_for_update().await.unwrap();

        assert!(manager.download_update(None).await.is_err());
        assert!(manager.preferences().pending_in(UpdateState::Available));

        fixture.files.clear_failures();
        assert!(manager.download_update(None).await.unwrap());
    }

    #[tokio::test]
    async fn test_extract_requires_pending() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;
        assert!(!manager.extract_update(None).await.unwrap());

        manager
            .update_prefs(|p| p.available_update = Some(pending("v2", UpdateState::Pending)))
            .await
            .unwrap();
        assert!(manager.extract_update(None).await.unwrap());

        let prefs = manager.preferences();
        assert!(prefs.pending_in(UpdateState::Ready));
        assert_eq!(prefs.updates["v2"].state, UpdateState::Ready);
        assert!(!manager.extract_update(None).await.unwrap());
    }

    #[tokio::test]
    async fn test_reload_commits_once_and_redirects() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;
        manager
            .update_prefs(|p| {
                let ready = pending("v2", UpdateState::Ready);
                p.updates.insert("v2".to_string(), ready.clone());
                p.available_update = Some(ready);
            })
            .await
            .unwrap();
        let mut ready = manager.ready_signal();

        assert!(manager.reload_app().await.unwrap());

        let prefs = manager.preferences();
        assert_eq!(prefs.current_version_id.as_deref(), Some("v2"));
        assert_eq!(prefs.current_build_id.as_deref(), Some("build-v2"));
        assert!(prefs.available_update.is_none());
        assert_eq!(fixture.navigation.redirects(), vec![fixture.snapshots.join("v2")]);
        assert!(!*ready.borrow_and_update());

        // Now serving v2: second reload is a no-op that signals ready.
        assert!(!manager.reload_app().await.unwrap());
        assert_eq!(fixture.navigation.redirects().len(), 1);
        assert!(*ready.borrow_and_update());
        assert_eq!(fixture.navigation.persisted(), fixture.snapshots.join("v2"));
    }

    #[tokio::test]
    async fn test_reload_without_current_signals_ready() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;
        let ready = manager.ready_signal();

        assert!(!manager.reload_app().await.unwrap());
        assert!(*ready.borrow());
        assert!(fixture.navigation.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_reload_refuses_uninstalled_current() {
        let fixture = Fixture::with_store(seeded(&[], Some("ghost")));
        let manager = fixture.manager().await;

        assert!(!manager.reload_app().await.unwrap());
        assert!(fixture.navigation.redirects().is_empty());
        assert!(*manager.ready_signal().borrow());
    }

    #[tokio::test]
    async fn test_stale_cleanup_clears_current_reference() {
        let old = update("v1", "1", Utc::now());
        let fixture = Fixture::with_store(seeded(&[old], Some("v1")));
        std::fs::create_dir_all(fixture.snapshots.join("v1")).unwrap();
        let manager = fixture.manager().await;

        let removed = manager.cleanup_stale_versions().await.unwrap();

        assert_eq!(removed, vec!["v1"]);
        assert!(!fixture.snapshots.join("v1").exists());
        let prefs = manager.preferences();
        assert!(prefs.updates.is_empty());
        assert!(prefs.current_version_id.is_none());
        assert!(prefs.current_build_id.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_versions_trims_history() {
        let now = Utc::now();
        let updates: Vec<_> = (1..=4)
            .map(|i| update(&format!("v{}", i), "2", now - ChronoDuration::minutes(10 - i)))
            .collect();
        let fixture = Fixture::with_store(seeded(&updates, Some("v4")));
        let manager = fixture.manager().await;

        let removed = manager.cleanup_versions().await.unwrap();

        assert_eq!(removed, vec!["v1"]);
        let mut left: Vec<_> = manager.preferences().updates.into_keys().collect();
        left.sort();
        assert_eq!(left, vec!["v2", "v3", "v4"]);
    }

    #[tokio::test]
    async fn test_delete_refuses_active_version() {
        let fixture = Fixture::with_store(seeded(&[update("v1", "2", Utc::now())], Some("v1")));
        let manager = fixture.manager().await;
        fixture
            .navigation
            .set_active_base_path(&fixture.snapshots.join("v1"))
            .await
            .unwrap();

        assert!(!manager.delete_version_by_id("v1").await.unwrap());
        assert!(!manager.delete_version_by_id(BASE_VERSION_ID).await.unwrap());
        assert!(manager.get_version_by_id("v1").is_some());
    }

    #[tokio::test]
    async fn test_delete_clears_dangling_current() {
        let fixture = Fixture::with_store(seeded(&[update("v1", "2", Utc::now())], Some("v1")));
        let manager = fixture.manager().await;

        assert!(manager.delete_version_by_id("v1").await.unwrap());
        assert!(manager.get_current_version().is_none());
        assert!(manager.preferences().current_build_id.is_none());
        // Missing directory is tolerated.
        assert!(manager.delete_version_by_id("v9").await.unwrap());
    }

    #[tokio::test]
    async fn test_queries() {
        let now = Utc::now();
        let fixture = Fixture::with_store(seeded(
            &[
                update("v1", "2", now - ChronoDuration::hours(1)),
                update("v2", "2", now),
            ],
            Some("v1"),
        ));
        let manager = fixture.manager().await;

        assert_eq!(manager.get_current_version().unwrap().version_id, "v1");
        assert_eq!(manager.get_version_by_id("v2").unwrap().build_id, "build-v2");
        assert!(manager.get_version_by_id("v3").is_none());
        let ids: Vec<_> = manager
            .get_available_versions()
            .into_iter()
            .map(|s| s.version_id)
            .collect();
        assert_eq!(ids, vec!["v2", "v1"]);
    }

    #[tokio::test]
    async fn test_configure_rejects_invalid_before_saving() {
        let fixture = Fixture::new();
        let manager = fixture.manager().await;
        let saves = fixture.store.save_count();

        assert!(manager
            .configure(&DeployConfig::new().with_max_versions(0))
            .await
            .is_err());
        assert_eq!(fixture.store.save_count(), saves);

        manager
            .configure(&DeployConfig::new().with_channel("Beta"))
            .await
            .unwrap();
        assert_eq!(manager.get_configuration().channel, "Beta");
    }
}
