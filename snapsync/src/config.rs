//! Configuration for the update engine.
//!
//! Two layers exist:
//! - [`InitialConfig`] seeds the preferences on first run and carries the
//!   identity of the binary that is currently running.
//! - [`DeployConfig`] is a partial override applied at runtime through
//!   `configure`; it is validated before anything is persisted.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;

use crate::error::{SyncError, SyncResult};
use crate::preferences::{Preferences, UpdateMethod};

/// Default remote service host.
pub const DEFAULT_HOST: &str = "https://api.ionicjs.com";

/// Default channel new installs listen on.
pub const DEFAULT_CHANNEL: &str = "Master";

/// Default number of non-current snapshots kept on disk.
pub const DEFAULT_MAX_VERSIONS: usize = 2;

/// Default seconds in the background before a resume re-runs the update flow.
pub const DEFAULT_MIN_BACKGROUND_SECS: u64 = 30;

/// Timeout for the update check request.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// First-run defaults and the running binary's identity.
#[derive(Debug, Clone)]
pub struct InitialConfig {
    pub app_id: String,
    pub channel: String,
    pub host: String,
    pub binary_version_name: String,
    pub binary_version_code: String,
    pub update_method: UpdateMethod,
    pub max_versions: usize,
    pub min_background_duration: u64,
    pub disabled: bool,
}

impl InitialConfig {
    /// Create a config for the given app and binary identity with defaults.
    pub fn new(
        app_id: impl Into<String>,
        binary_version_name: impl Into<String>,
        binary_version_code: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            channel: DEFAULT_CHANNEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            binary_version_name: binary_version_name.into(),
            binary_version_code: binary_version_code.into(),
            update_method: UpdateMethod::default(),
            max_versions: DEFAULT_MAX_VERSIONS,
            min_background_duration: DEFAULT_MIN_BACKGROUND_SECS,
            disabled: false,
        }
    }

    /// Set the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set the remote host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the default update method.
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Set how many historical snapshots to keep.
    pub fn with_max_versions(mut self, max: usize) -> Self {
        self.max_versions = max;
        self
    }

    /// Set the minimum background duration in seconds.
    pub fn with_min_background_duration(mut self, secs: u64) -> Self {
        self.min_background_duration = secs;
        self
    }

    /// Enable or disable update checks entirely.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Runtime configuration override. Unset fields keep their persisted value.
#[derive(Debug, Clone, Default)]
pub struct DeployConfig {
    pub app_id: Option<String>,
    pub channel: Option<String>,
    pub host: Option<String>,
    pub update_method: Option<UpdateMethod>,
    pub max_versions: Option<usize>,
    pub min_background_duration: Option<u64>,
    pub disabled: Option<bool>,
}

impl DeployConfig {
    /// Create an empty override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the app id.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Override the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Override the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Override the update method.
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = Some(method);
        self
    }

    /// Override the number of kept versions.
    pub fn with_max_versions(mut self, max: usize) -> Self {
        self.max_versions = Some(max);
        self
    }

    /// Override the minimum background duration in seconds.
    pub fn with_min_background_duration(mut self, secs: u64) -> Self {
        self.min_background_duration = Some(secs);
        self
    }

    /// Override the disabled flag.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Reject malformed values.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(app_id) = &self.app_id {
            if app_id.trim().is_empty() {
                return Err(SyncError::Config("app_id must not be empty".to_string()));
            }
        }
        if let Some(channel) = &self.channel {
            if channel.trim().is_empty() {
                return Err(SyncError::Config("channel must not be empty".to_string()));
            }
        }
        if let Some(host) = &self.host {
            let url = Url::parse(host)
                .map_err(|e| SyncError::Config(format!("host '{}' is not a URL: {}", host, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(SyncError::Config(format!(
                    "host '{}' must use http or https",
                    host
                )));
            }
        }
        if self.max_versions == Some(0) {
            return Err(SyncError::Config(
                "max_versions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply the set fields onto the preferences. Call `validate` first.
    pub fn apply(&self, prefs: &mut Preferences) {
        if let Some(app_id) = &self.app_id {
            prefs.app_id = app_id.clone();
        }
        if let Some(channel) = &self.channel {
            prefs.channel = channel.clone();
        }
        if let Some(host) = &self.host {
            prefs.host = host.trim_end_matches('/').to_string();
        }
        if let Some(method) = self.update_method {
            prefs.update_method = method;
        }
        if let Some(max) = self.max_versions {
            prefs.max_versions = max;
        }
        if let Some(secs) = self.min_background_duration {
            prefs.min_background_duration = secs;
        }
        if let Some(disabled) = self.disabled {
            prefs.disabled = disabled;
        }
    }
}

/// Snapshot of the effective configuration, as reported by `get_configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConfig {
    pub app_id: String,
    pub channel: String,
    pub host: String,
    pub binary_version_name: String,
    pub binary_version_code: String,
    pub disabled: bool,
    pub update_method: UpdateMethod,
    pub max_versions: usize,
    pub min_background_duration: u64,
    pub current_version_id: Option<String>,
    pub current_build_id: Option<String>,
}

impl From<&Preferences> for CurrentConfig {
    fn from(prefs: &Preferences) -> Self {
        Self {
            app_id: prefs.app_id.clone(),
            channel: prefs.channel.clone(),
            host: prefs.host.clone(),
            binary_version_name: prefs.binary_version_name.clone(),
            binary_version_code: prefs.binary_version_code.clone(),
            disabled: prefs.disabled,
            update_method: prefs.update_method,
            max_versions: prefs.max_versions,
            min_background_duration: prefs.min_background_duration,
            current_version_id: prefs.current_version_id.clone(),
            current_build_id: prefs.current_build_id.clone(),
        }
    }
}
