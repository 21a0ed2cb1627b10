//! CLI error type.

use std::fmt;

use snapsync::SyncError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration.
    Config(String),
    /// Reading or writing the config file failed.
    ConfigFile(String),
    /// The tokio runtime could not be started.
    Runtime(String),
    /// The update engine reported an error.
    Sync(SyncError),
    /// A named version is not installed.
    UnknownVersion(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(msg) => write!(f, "Config file error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
            CliError::Sync(e) => write!(f, "{}", e),
            CliError::UnknownVersion(id) => write!(
                f,
                "Version '{}' is not installed. Use 'snapsync versions' to list installed versions.",
                id
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Config(msg) => CliError::Config(msg),
            other => CliError::Sync(other),
        }
    }
}

impl From<ini::Error> for CliError {
    fn from(e: ini::Error) -> Self {
        CliError::ConfigFile(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::ConfigFile(e.to_string())
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) => 2,
            CliError::UnknownVersion(_) => 3,
            CliError::Runtime(_) | CliError::Sync(_) => 1,
        }
    }
}
