//! Persisted session state: the preference blob and the update records it holds.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InitialConfig;

/// How a finished download gets activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    /// Never check or apply automatically.
    None,
    /// Check, download and reload as soon as an update is ready.
    Auto,
    /// Download in the background; the update applies on the next launch.
    #[default]
    Background,
}

impl UpdateMethod {
    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            "background" => Ok(Self::Background),
            other => Err(format!(
                "unknown update method '{}' (expected none, auto or background)",
                other
            )),
        }
    }
}

/// Progress of the pending update through the install pipeline.
///
/// Only ever advances `Available -> Pending -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateState {
    /// Announced by the remote service, nothing downloaded yet.
    Available,
    /// All files are present in the snapshot directory.
    Pending,
    /// Registered as an installed version, waiting to be activated.
    Ready,
}

/// A snapshot announced by the remote service, tracked through installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableUpdate {
    pub version_id: String,
    pub build_id: String,
    pub channel: String,
    pub binary_version_name: String,
    pub binary_version_code: String,
    pub url: String,
    pub state: UpdateState,
    pub last_used: DateTime<Utc>,
}

impl AvailableUpdate {
    /// Whether this update was built for the given binary identity.
    pub fn matches_binary(&self, name: &str, code: &str) -> bool {
        self.binary_version_name == name && self.binary_version_code == code
    }
}

/// Public descriptor of an installed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub version_id: String,
    pub build_id: String,
    pub channel: String,
    pub binary_version_name: String,
    pub binary_version_code: String,
}

impl From<&AvailableUpdate> for SnapshotInfo {
    fn from(update: &AvailableUpdate) -> Self {
        Self {
            version_id: update.version_id.clone(),
            build_id: update.build_id.clone(),
            channel: update.channel.clone(),
            binary_version_name: update.binary_version_name.clone(),
            binary_version_code: update.binary_version_code.clone(),
        }
    }
}

/// The whole persisted session state for one app install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub app_id: String,
    pub channel: String,
    pub host: String,
    pub binary_version_name: String,
    pub binary_version_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_build_id: Option<String>,
    #[serde(default)]
    pub update_method: UpdateMethod,
    pub max_versions: usize,
    /// Seconds the app must stay in the background before a resume re-checks.
    pub min_background_duration: u64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub updates: HashMap<String, AvailableUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_update: Option<AvailableUpdate>,
}

impl Preferences {
    /// First-run preferences built from the initial configuration.
    pub fn from_initial(initial: &InitialConfig) -> Self {
        Self {
            app_id: initial.app_id.clone(),
            channel: initial.channel.clone(),
            host: initial.host.clone(),
            binary_version_name: initial.binary_version_name.clone(),
            binary_version_code: initial.binary_version_code.clone(),
            current_version_id: None,
            current_build_id: None,
            update_method: initial.update_method,
            max_versions: initial.max_versions,
            min_background_duration: initial.min_background_duration,
            disabled: initial.disabled,
            updates: HashMap::new(),
            available_update: None,
        }
    }

    /// State of the pending update, if any.
    pub fn pending_state(&self) -> Option<UpdateState> {
        self.available_update.as_ref().map(|u| u.state)
    }

    /// Whether the pending update is in exactly the given state.
    pub fn pending_in(&self, state: UpdateState) -> bool {
        self.pending_state() == Some(state)
    }

    /// The installed record for the committed current version.
    pub fn current_update(&self) -> Option<&AvailableUpdate> {
        let id = self.current_version_id.as_ref()?;
        self.current_build_id.as_ref()?;
        self.updates.get(id)
    }
}
