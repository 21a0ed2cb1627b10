//! Shared setup for commands that drive the update engine.
//!
//! Loads the config file, applies command-line overrides, starts logging and
//! a tokio runtime, and builds a [`SyncOrchestrator`] over the local
//! collaborators.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use snapsync::logging::{init_logging, LogGuard};
use snapsync::{
    AlwaysOnline, Collaborators, FileNavigation, JsonFilePreferencesStore, LocalFileManager,
    ReqwestClient, SyncOrchestrator,
};
use tokio::runtime::Runtime;
use tracing::info;

use crate::config_file::{config_file_path, ConfigFile};
use crate::error::CliError;

/// Options shared by every engine command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub channel: Option<String>,
    pub host: Option<String>,
}

impl GlobalOptions {
    /// Config file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }

    /// Load the config file with overrides applied.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let mut config = ConfigFile::load(&self.config_path())?;
        if let Some(channel) = &self.channel {
            config.app.channel = channel.clone();
        }
        if let Some(host) = &self.host {
            config.app.host = host.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// Runtime, logging and configuration for one CLI invocation.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _log_guard: LogGuard,
}

impl CliRunner {
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let config = options.load_config()?;
        let log_guard = init_logging(&config.log_dir(), options.verbose)?;
        let runtime = Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
        Ok(Self {
            config,
            runtime,
            _log_guard: log_guard,
        })
    }

    /// Log the invocation.
    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            app_id = %self.config.app.app_id,
            channel = %self.config.app.channel,
            "snapsync CLI started"
        );
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Build the engine and re-apply the file's settings to it.
    pub fn engine(&self) -> Result<SyncOrchestrator, CliError> {
        let config = &self.config;
        let deploy = config.deploy_config();
        deploy.validate()?;

        let collaborators = Collaborators {
            http: Arc::new(ReqwestClient::new()?),
            files: Arc::new(LocalFileManager::with_timeout(LocalFileManager::default_timeout())?),
            store: Arc::new(JsonFilePreferencesStore::new(config.preferences_path())),
            navigation: Arc::new(FileNavigation::new(
                config.navigation_path(),
                &config.paths.bundled_dir,
            )),
            connectivity: Arc::new(AlwaysOnline),
        };

        self.block_on(async {
            let engine =
                SyncOrchestrator::new(&config.initial_config(), config.platform(), collaborators)
                    .await?;
            engine.configure(&deploy).await?;
            Ok::<_, CliError>(engine)
        })
    }
}
