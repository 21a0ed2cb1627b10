//! Update pipeline commands: check, download, extract, reload, sync and the
//! startup policy.

use clap::Subcommand;
use snapsync::{StartupOutcome, SyncOptions, SyncOrchestrator, UpdateMethod};

use crate::error::CliError;
use crate::progress::{spinner, PercentBar};
use crate::runner::{CliRunner, GlobalOptions};

/// Pipeline subcommands.
#[derive(Debug, Subcommand)]
pub enum UpdateCommand {
    /// Ask the update service whether a newer snapshot exists
    Check,

    /// Download the available update into a new snapshot directory
    Download,

    /// Register a downloaded update as installed
    Extract,

    /// Activate the installed current version
    Reload,

    /// Check, download and extract in one go (and reload with --method auto)
    Sync {
        /// Update method for this run only (none, auto, background)
        #[arg(long)]
        method: Option<UpdateMethod>,
    },

    /// Run the app-start policy as a launching app would
    Startup,
}

/// Run a pipeline subcommand.
pub fn run(command: UpdateCommand, options: &GlobalOptions) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    let name = match &command {
        UpdateCommand::Check => "check",
        UpdateCommand::Download => "download",
        UpdateCommand::Extract => "extract",
        UpdateCommand::Reload => "reload",
        UpdateCommand::Sync { .. } => "sync",
        UpdateCommand::Startup => "startup",
    };
    runner.log_startup(name);
    let engine = runner.engine()?;

    match command {
        UpdateCommand::Check => {
            let response = runner.block_on(engine.check_for_update())?;
            if response.available && response.compatible {
                println!(
                    "Update available: {} (build {})",
                    response.snapshot.as_deref().unwrap_or("?"),
                    response.build.as_deref().unwrap_or("?")
                );
            } else if response.incompatible_update_available() {
                println!("An update exists but requires a newer app binary");
            } else {
                println!("Up to date");
            }
        }
        UpdateCommand::Download => {
            let bar = PercentBar::new("download");
            match runner.block_on(engine.download_update(Some(bar.callback()))) {
                Ok(true) => bar.finish("downloaded"),
                Ok(false) => {
                    bar.abandon();
                    println!("Nothing to download. Run 'snapsync check' first.");
                }
                Err(e) => {
                    bar.abandon();
                    return Err(e.into());
                }
            }
        }
        UpdateCommand::Extract => {
            if runner.block_on(engine.extract_update(None))? {
                println!("Update installed; run 'snapsync reload' to activate it");
            } else {
                println!("No downloaded update to install");
            }
        }
        UpdateCommand::Reload => {
            if runner.block_on(engine.reload_app())? {
                confirm_redirect(&runner, &engine)?;
                print_current("Now serving", &engine);
            } else {
                print_current("Still serving", &engine);
            }
        }
        UpdateCommand::Sync { method } => {
            let bar = PercentBar::new("sync");
            let options = SyncOptions {
                update_method: method,
            };
            let before = engine.get_current_version();
            match runner.block_on(engine.sync(options, Some(bar.callback()))) {
                Ok(_) => bar.finish("done"),
                Err(e) => {
                    bar.abandon();
                    return Err(e.into());
                }
            }
            if engine.get_current_version() != before {
                confirm_redirect(&runner, &engine)?;
            }
            print_current("Current version", &engine);
        }
        UpdateCommand::Startup => {
            let outcome = runner.block_on(engine.handle_initial_preference_state())?;
            report_startup(&runner, &engine, outcome)?;
            print_current("Serving", &engine);
        }
    }

    Ok(())
}

/// Confirm a redirect the way a webview does once it comes up on the new
/// base: persist it and trim old snapshots.
fn confirm_redirect(runner: &CliRunner, engine: &SyncOrchestrator) -> Result<(), CliError> {
    runner.block_on(engine.reload_app())?;
    Ok(())
}

fn report_startup(
    runner: &CliRunner,
    engine: &SyncOrchestrator,
    outcome: StartupOutcome,
) -> Result<(), CliError> {
    if outcome.redirected {
        println!("Switched to the installed update");
    }
    if let Some(background) = outcome.background {
        let spinner = spinner("Syncing in the background...");
        let result = runner.block_on(background.wait());
        spinner.finish_and_clear();
        match result? {
            Some(current) => println!("Background sync done (current {})", current.version_id),
            None => println!("Background sync done"),
        }
    }
    if outcome.redirected {
        confirm_redirect(runner, engine)?;
    }
    Ok(())
}

fn print_current(label: &str, engine: &SyncOrchestrator) {
    match engine.get_current_version() {
        Some(current) => println!(
            "{}: {} (build {}, channel {})",
            label, current.version_id, current.build_id, current.channel
        ),
        None => println!("{}: bundled app", label),
    }
}
