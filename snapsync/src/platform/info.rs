//! Static platform facts resolved once at construction.

use std::path::{Path, PathBuf};

/// Reserved version id for the resources bundled with the binary.
pub const BASE_VERSION_ID: &str = "base";

/// Manifest file name, both in the bundle and inside each snapshot.
pub const MANIFEST_FILE: &str = "pro-manifest.json";

/// Plugin resources copied from the bundled app into every new snapshot.
const DEFAULT_PLUGIN_RESOURCES: &[&str] = &["cordova.js", "cordova_plugins.js", "plugins"];

/// Description of the host platform and its directory layout.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    /// Platform name reported to the update service (e.g. "ios", "android").
    pub platform: String,
    /// Platform OS version.
    pub platform_version: String,
    /// Stable device identifier.
    pub device_id: String,
    /// Version of this engine reported to the update service.
    pub plugin_version: String,
    /// Directory holding the resources bundled with the binary.
    pub bundled_dir: PathBuf,
    /// Directory under which each snapshot gets its own subdirectory.
    pub snapshot_root: PathBuf,
    /// Paths relative to `bundled_dir` that every snapshot needs from the binary.
    pub plugin_resources: Vec<String>,
}

impl PlatformInfo {
    /// Create a descriptor with default plugin resources.
    pub fn new(
        platform: impl Into<String>,
        bundled_dir: impl Into<PathBuf>,
        snapshot_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform: platform.into(),
            platform_version: String::new(),
            device_id: String::new(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
            bundled_dir: bundled_dir.into(),
            snapshot_root: snapshot_root.into(),
            plugin_resources: DEFAULT_PLUGIN_RESOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Set the platform version.
    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    /// Set the device id.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Replace the list of plugin resources.
    pub fn with_plugin_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugin_resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// Directory holding the snapshot for `version_id`.
    ///
    /// `base` resolves to the bundled resources.
    pub fn snapshot_dir(&self, version_id: &str) -> PathBuf {
        if version_id == BASE_VERSION_ID {
            self.bundled_dir.clone()
        } else {
            self.snapshot_root.join(version_id)
        }
    }

    /// Manifest stored inside the snapshot for `version_id`.
    pub fn manifest_path(&self, version_id: &str) -> PathBuf {
        self.snapshot_dir(version_id).join(MANIFEST_FILE)
    }

    /// Manifest shipped with the binary.
    pub fn bundled_manifest_path(&self) -> PathBuf {
        self.bundled_dir.join(MANIFEST_FILE)
    }

    /// Whether `active` is the directory serving `version_id`.
    pub fn is_serving(&self, active: &Path, version_id: &str) -> bool {
        active == self.snapshot_dir(version_id) || active.ends_with(version_id)
    }
}
