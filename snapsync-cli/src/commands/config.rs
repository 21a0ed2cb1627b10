//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, `config path` and
//! `config show` for the INI file and the engine's effective configuration.

use clap::Subcommand;

use crate::config_file::{ConfigFile, ConfigKey};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., app.channel)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., app.channel)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Show the configuration the engine is running with
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key, options),
        ConfigCommands::Set { key, value } => run_set(&key, &value, options),
        ConfigCommands::List => run_list(options),
        ConfigCommands::Path => run_path(options),
        ConfigCommands::Show => run_show(options),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'snapsync config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(key: &str, options: &GlobalOptions) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = options.load_config()?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str, options: &GlobalOptions) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let path = options.config_path();

    let mut config = ConfigFile::load(&path)?;
    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(format!("{}: {}", config_key, e)))?;
    config.save(&path)?;

    println!("Set {} = {}", config_key.name(), value);

    Ok(())
}

/// List all configuration settings.
fn run_list(options: &GlobalOptions) -> Result<(), CliError> {
    let config = options.load_config()?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}

/// Show the configuration file path.
fn run_path(options: &GlobalOptions) -> Result<(), CliError> {
    println!("{}", options.config_path().display());
    Ok(())
}

/// Show the engine's effective configuration.
fn run_show(options: &GlobalOptions) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    let engine = runner.engine()?;
    let current = engine.get_configuration();

    println!("App ID:          {}", current.app_id);
    println!("Channel:         {}", current.channel);
    println!("Host:            {}", current.host);
    println!("Update method:   {}", current.update_method);
    println!("Max versions:    {}", current.max_versions);
    println!("Min background:  {}s", current.min_background_duration);
    println!(
        "Binary:          {} ({})",
        current.binary_version_name, current.binary_version_code
    );
    println!(
        "Current version: {}",
        current.current_version_id.as_deref().unwrap_or("(bundled)")
    );

    Ok(())
}
