//! Error types for the update engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for update engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while checking, downloading or activating snapshots.
///
/// Calling a lifecycle step out of sequence is not an error: those operations
/// return `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (offline, connection refused, unreadable body).
    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The remote service answered with a non-success status.
    #[error("Error Status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The update check did not answer in time.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Malformed configuration, rejected before any collaborator is touched.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A manifest body was not a valid JSON manifest.
    #[error("failed to parse manifest from {source_name}: {reason}")]
    ManifestParse { source_name: String, reason: String },

    /// A native file operation (copy, remove, download, list) failed.
    #[error("file operation '{operation}' failed on {}: {reason}", path.display())]
    FileOperation {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// Loading or saving preferences failed.
    #[error("failed to persist preferences: {0}")]
    Persistence(String),

    /// A spawned background task panicked or was dropped.
    #[error("background task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Build a `FileOperation` error from an I/O error.
    pub fn file_op(operation: &'static str, path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::FileOperation {
            operation,
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Build a `Network` error from any displayable cause.
    pub fn network(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the network layer (offline, status, timeout).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let err = SyncError::HttpStatus {
            status: 404,
            message: "App not found".to_string(),
        };
        assert_eq!(err.to_string(), "Error Status 404: App not found");
    }

    #[test]
    fn test_file_op_display_includes_path() {
        let err = SyncError::file_op(
            "remove",
            "/snapshots/abc",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("remove"));
        assert!(msg.contains("/snapshots/abc"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_is_network() {
        assert!(SyncError::network("http://x", "refused").is_network());
        assert!(SyncError::Timeout {
            url: "http://x".to_string(),
            timeout_secs: 5
        }
        .is_network());
        assert!(!SyncError::Config("bad".to_string()).is_network());
    }
}
