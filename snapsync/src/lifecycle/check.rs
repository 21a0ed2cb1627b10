//! The remote check-for-update call.
//!
//! `POST {host}/apps/{app_id}/channels/check-device` with the running
//! binary's identity and the currently installed snapshot. The request runs
//! as its own task raced against a timer; when the timer wins the task is
//! left to finish on its own and its answer is ignored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpResponse};
use crate::platform::PlatformInfo;
use crate::preferences::{AvailableUpdate, Preferences, UpdateState};

/// Device section of the check request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub binary_version: String,
    pub device_id: String,
    pub platform: String,
    pub platform_version: String,
    pub snapshot: Option<String>,
    pub build: Option<String>,
}

/// Body of the check request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckDeviceRequest {
    pub channel_name: String,
    pub app_id: String,
    pub device: DeviceInfo,
    pub plugin_version: String,
    pub manifest: bool,
}

impl CheckDeviceRequest {
    /// Build the request for the current session.
    pub fn new(prefs: &Preferences, platform: &PlatformInfo) -> Self {
        Self {
            channel_name: prefs.channel.clone(),
            app_id: prefs.app_id.clone(),
            device: DeviceInfo {
                binary_version: prefs.binary_version_name.clone(),
                device_id: platform.device_id.clone(),
                platform: platform.platform.clone(),
                platform_version: platform.platform_version.clone(),
                snapshot: prefs.current_version_id.clone(),
                build: prefs.current_build_id.clone(),
            },
            plugin_version: platform.plugin_version.clone(),
            manifest: true,
        }
    }
}

/// Answer of the update service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckForUpdateResponse {
    pub available: bool,
    pub compatible: bool,
    pub partial: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
}

impl CheckForUpdateResponse {
    /// Response used when checks are disabled.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// An update exists but was built for a different binary.
    pub fn incompatible_update_available(&self) -> bool {
        self.available && !self.compatible
    }

    /// The pending-update record this response announces, if complete.
    pub fn to_available_update(
        &self,
        prefs: &Preferences,
        now: DateTime<Utc>,
    ) -> Option<AvailableUpdate> {
        if !self.available {
            return None;
        }
        let (url, snapshot, build) = (self.url.as_ref()?, self.snapshot.as_ref()?, self.build.as_ref()?);
        Some(AvailableUpdate {
            version_id: snapshot.clone(),
            build_id: build.clone(),
            channel: prefs.channel.clone(),
            binary_version_name: prefs.binary_version_name.clone(),
            binary_version_code: prefs.binary_version_code.clone(),
            url: url.clone(),
            state: UpdateState::Available,
            last_used: now,
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    data: CheckForUpdateResponse,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Endpoint for the check request.
pub fn check_endpoint(host: &str, app_id: &str) -> String {
    format!(
        "{}/apps/{}/channels/check-device",
        host.trim_end_matches('/'),
        app_id
    )
}

/// Send the check request, giving up after `timeout`.
pub async fn check_device(
    http: Arc<dyn HttpClient>,
    endpoint: String,
    request: &CheckDeviceRequest,
    timeout: Duration,
) -> SyncResult<CheckForUpdateResponse> {
    let body = serde_json::to_value(request).map_err(|e| SyncError::network(&endpoint, e))?;
    let url = endpoint.clone();
    let task = tokio::spawn(async move { http.post_json(&endpoint, &body).await });

    let response = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(SyncError::Task(e.to_string())),
        Err(_) => {
            warn!(url = %url, "Update check timed out");
            return Err(SyncError::Timeout {
                url,
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    parse_check_response(&url, &response)
}

/// Decode a check response, turning error statuses into `HttpStatus` errors.
pub fn parse_check_response(url: &str, response: &HttpResponse) -> SyncResult<CheckForUpdateResponse> {
    if !response.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&response.body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| response.text());
        return Err(SyncError::HttpStatus {
            status: response.status,
            message,
        });
    }

    serde_json::from_slice::<Envelope>(&response.body)
        .map(|envelope| envelope.data)
        .map_err(|e| SyncError::network(url, format!("invalid check response: {}", e)))
}
