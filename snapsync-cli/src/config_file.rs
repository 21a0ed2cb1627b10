//! INI configuration file for the CLI.
//!
//! Located at `<config_dir>/snapsync/config.ini` unless `--config` is given.
//!
//! ```ini
//! [app]
//! app_id = 1a2b3c4d
//! channel = Master
//! host = https://api.ionicjs.com
//! update_method = background
//! max_versions = 2
//! min_background_duration = 30
//! binary_version_name = 1.0.0
//! binary_version_code = 1
//! platform = linux
//! device_id =
//!
//! [paths]
//! bundled_dir = ./www
//! snapshot_root = ~/.local/share/snapsync/snapshots
//! state_dir = ~/.local/share/snapsync
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use snapsync::config::{
    DEFAULT_CHANNEL, DEFAULT_HOST, DEFAULT_MAX_VERSIONS, DEFAULT_MIN_BACKGROUND_SECS,
};
use snapsync::{DeployConfig, InitialConfig, PlatformInfo, UpdateMethod};

use crate::error::CliError;

/// Default config file location.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapsync")
        .join("config.ini")
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapsync")
}

fn expand_tilde(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

/// `[app]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSection {
    pub app_id: String,
    pub channel: String,
    pub host: String,
    pub update_method: UpdateMethod,
    pub max_versions: usize,
    pub min_background_duration: u64,
    pub binary_version_name: String,
    pub binary_version_code: String,
    pub platform: String,
    pub device_id: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            channel: DEFAULT_CHANNEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            update_method: UpdateMethod::default(),
            max_versions: DEFAULT_MAX_VERSIONS,
            min_background_duration: DEFAULT_MIN_BACKGROUND_SECS,
            binary_version_name: "1.0.0".to_string(),
            binary_version_code: "1".to_string(),
            platform: std::env::consts::OS.to_string(),
            device_id: String::new(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSection {
    pub bundled_dir: PathBuf,
    pub snapshot_root: PathBuf,
    pub state_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        let state_dir = default_state_dir();
        Self {
            bundled_dir: PathBuf::from("www"),
            snapshot_root: state_dir.join("snapshots"),
            state_dir,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub app: AppSection,
    pub paths: PathsSection,
}

impl ConfigFile {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value).map_err(|e| {
                    CliError::Config(format!("{} in {}: {}", key.name(), path.display(), e))
                })?;
            }
        }
        Ok(config)
    }

    /// Write every key to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini.write_to_file(path)?;
        Ok(())
    }

    /// First-run defaults for the engine.
    pub fn initial_config(&self) -> InitialConfig {
        InitialConfig::new(
            &self.app.app_id,
            &self.app.binary_version_name,
            &self.app.binary_version_code,
        )
        .with_channel(&self.app.channel)
        .with_host(&self.app.host)
        .with_update_method(self.app.update_method)
        .with_max_versions(self.app.max_versions)
        .with_min_background_duration(self.app.min_background_duration)
    }

    /// Settings re-applied on every run so the file stays authoritative.
    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig::new()
            .with_app_id(&self.app.app_id)
            .with_channel(&self.app.channel)
            .with_host(&self.app.host)
            .with_update_method(self.app.update_method)
            .with_max_versions(self.app.max_versions)
            .with_min_background_duration(self.app.min_background_duration)
    }

    /// Platform descriptor for this machine.
    pub fn platform(&self) -> PlatformInfo {
        PlatformInfo::new(
            &self.app.platform,
            &self.paths.bundled_dir,
            &self.paths.snapshot_root,
        )
        .with_device_id(&self.app.device_id)
    }

    /// Preferences blob location.
    pub fn preferences_path(&self) -> PathBuf {
        self.paths.state_dir.join("preferences.json")
    }

    /// Navigation state location.
    pub fn navigation_path(&self) -> PathBuf {
        self.paths.state_dir.join("navigation.json")
    }

    /// Log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.paths.state_dir.join("logs")
    }
}

/// Every settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    AppId,
    Channel,
    Host,
    UpdateMethod,
    MaxVersions,
    MinBackgroundDuration,
    BinaryVersionName,
    BinaryVersionCode,
    Platform,
    DeviceId,
    BundledDir,
    SnapshotRoot,
    StateDir,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            AppId,
            Channel,
            Host,
            UpdateMethod,
            MaxVersions,
            MinBackgroundDuration,
            BinaryVersionName,
            BinaryVersionCode,
            Platform,
            DeviceId,
            BundledDir,
            SnapshotRoot,
            StateDir,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::BundledDir | ConfigKey::SnapshotRoot | ConfigKey::StateDir => "paths",
            _ => "app",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::AppId => "app_id",
            ConfigKey::Channel => "channel",
            ConfigKey::Host => "host",
            ConfigKey::UpdateMethod => "update_method",
            ConfigKey::MaxVersions => "max_versions",
            ConfigKey::MinBackgroundDuration => "min_background_duration",
            ConfigKey::BinaryVersionName => "binary_version_name",
            ConfigKey::BinaryVersionCode => "binary_version_code",
            ConfigKey::Platform => "platform",
            ConfigKey::DeviceId => "device_id",
            ConfigKey::BundledDir => "bundled_dir",
            ConfigKey::SnapshotRoot => "snapshot_root",
            ConfigKey::StateDir => "state_dir",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        let app = &config.app;
        let paths = &config.paths;
        match self {
            ConfigKey::AppId => app.app_id.clone(),
            ConfigKey::Channel => app.channel.clone(),
            ConfigKey::Host => app.host.clone(),
            ConfigKey::UpdateMethod => app.update_method.to_string(),
            ConfigKey::MaxVersions => app.max_versions.to_string(),
            ConfigKey::MinBackgroundDuration => app.min_background_duration.to_string(),
            ConfigKey::BinaryVersionName => app.binary_version_name.clone(),
            ConfigKey::BinaryVersionCode => app.binary_version_code.clone(),
            ConfigKey::Platform => app.platform.clone(),
            ConfigKey::DeviceId => app.device_id.clone(),
            ConfigKey::BundledDir => paths.bundled_dir.display().to_string(),
            ConfigKey::SnapshotRoot => paths.snapshot_root.display().to_string(),
            ConfigKey::StateDir => paths.state_dir.display().to_string(),
        }
    }

    /// Parse and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), String> {
        let value = value.trim();
        let app = &mut config.app;
        let paths = &mut config.paths;
        match self {
            ConfigKey::AppId => app.app_id = value.to_string(),
            ConfigKey::Channel => app.channel = value.to_string(),
            ConfigKey::Host => app.host = value.trim_end_matches('/').to_string(),
            ConfigKey::UpdateMethod => app.update_method = value.parse()?,
            ConfigKey::MaxVersions => {
                app.max_versions = value
                    .parse()
                    .map_err(|_| format!("'{}' is not a whole number", value))?
            }
            ConfigKey::MinBackgroundDuration => {
                app.min_background_duration = value
                    .parse()
                    .map_err(|_| format!("'{}' is not a number of seconds", value))?
            }
            ConfigKey::BinaryVersionName => app.binary_version_name = value.to_string(),
            ConfigKey::BinaryVersionCode => app.binary_version_code = value.to_string(),
            ConfigKey::Platform => app.platform = value.to_string(),
            ConfigKey::DeviceId => app.device_id = value.to_string(),
            ConfigKey::BundledDir => paths.bundled_dir = expand_tilde(value),
            ConfigKey::SnapshotRoot => paths.snapshot_root = expand_tilde(value),
            ConfigKey::StateDir => paths.state_dir = expand_tilde(value),
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s || key.key_name() == s)
            .ok_or_else(|| format!("unknown configuration key '{}'", s))
    }
}
