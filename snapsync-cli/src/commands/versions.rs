//! Installed version queries and deletion.

use clap::Subcommand;
use snapsync::SnapshotInfo;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Version subcommands.
#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Show the current version
    Current,

    /// List installed versions, most recently used first
    Versions,

    /// Show one installed version
    Show {
        /// Version id
        version_id: String,
    },

    /// Delete an installed version
    Delete {
        /// Version id
        version_id: String,
    },
}

/// Run a version subcommand.
pub fn run(command: VersionCommand, options: &GlobalOptions) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("versions");
    let engine = runner.engine()?;

    match command {
        VersionCommand::Current => match engine.get_current_version() {
            Some(info) => print_info(&info),
            None => println!("No update installed; serving the bundled app"),
        },
        VersionCommand::Versions => {
            let versions = engine.get_available_versions();
            if versions.is_empty() {
                println!("No installed versions");
            }
            let current = engine.get_current_version().map(|c| c.version_id);
            for info in versions {
                let marker = if Some(&info.version_id) == current.as_ref() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {:<24} build {:<16} {} ({})",
                    marker,
                    info.version_id,
                    info.build_id,
                    info.binary_version_name,
                    info.binary_version_code
                );
            }
        }
        VersionCommand::Show { version_id } => {
            let info = engine
                .get_version_by_id(&version_id)
                .ok_or(CliError::UnknownVersion(version_id))?;
            print_info(&info);
        }
        VersionCommand::Delete { version_id } => {
            if engine.get_version_by_id(&version_id).is_none() {
                return Err(CliError::UnknownVersion(version_id));
            }
            if runner.block_on(engine.delete_version_by_id(&version_id))? {
                println!("Deleted {}", version_id);
            } else {
                println!("{} is being served and cannot be deleted", version_id);
            }
        }
    }

    Ok(())
}

fn print_info(info: &SnapshotInfo) {
    println!("Version:  {}", info.version_id);
    println!("Build:    {}", info.build_id);
    println!("Channel:  {}", info.channel);
    println!(
        "Binary:   {} ({})",
        info.binary_version_name, info.binary_version_code
    );
}
