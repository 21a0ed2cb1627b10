//! snapsync CLI - Command-line interface
//!
//! Drives the snapsync update engine against a local snapshot directory:
//! checks the update service, downloads changed files, installs and
//! activates snapshots, and manages installed versions.

mod commands;
mod config_file;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::update::UpdateCommand;
use commands::versions::VersionCommand;
use error::CliError;
use runner::GlobalOptions;

#[derive(Debug, Parser)]
#[command(name = "snapsync")]
#[command(version, about = "Over-the-air snapshot updates for application bundles", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the update channel for this run
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Override the update service host for this run
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(flatten)]
    Update(UpdateCommand),

    #[command(flatten)]
    Versions(VersionCommand),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
        channel: cli.channel,
        host: cli.host,
    };

    if let Err(e) = run(cli.command, &options) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(command: Commands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        Commands::Update(command) => commands::update::run(command, options),
        Commands::Versions(command) => commands::versions::run(command, options),
        Commands::Config { command } => commands::config::run(command, options),
    }
}
