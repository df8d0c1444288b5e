// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pkguninst::config::{STAGING_DIR_ENV, Settings};
use pkguninst::interaction::{Interaction, TerminalInteraction, Tone};
use pkguninst::system::{Csrutil, PrivilegeLevel, SystemIntegrity};
use pkguninst::{PackageSelector, Pkgutil, RemovalOptions, Remover, Volume};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "pkguninst")]
#[command(author, version, about = "Remove macOS packages and the files their receipts list", long_about = None)]
struct Cli {
    /// Staging directory for files being removed
    #[arg(long, global = true, env = STAGING_DIR_ENV)]
    staging_dir: Option<PathBuf>,

    /// Log progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show installed packages
    List {
        /// Only show packages installed on this volume
        #[arg(long, default_value = "/")]
        volume: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the files and directories a package still owns
    Files {
        /// Package ID
        id: String,
        /// Volume the package is installed on
        #[arg(long, default_value = "/")]
        volume: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Remove files and directories installed by packages
    Remove {
        /// Only remove packages from this volume
        #[arg(long, default_value = "/")]
        volume: String,
        /// Operate on these package IDs
        #[arg(long = "id", num_args = 1.., conflicts_with = "regex", required_unless_present = "regex")]
        ids: Vec<String>,
        /// Or operate on packages matching a regex expression
        #[arg(long)]
        regex: Option<String>,
        /// Do not check if a package is provided by Apple
        #[arg(short, long)]
        force: bool,
        /// Do not prompt for final user confirmation
        #[arg(short, long)]
        quiet: bool,
    },
    /// Enter keyboard interactive mode (default)
    Interactive {
        /// Allow removing Apple-provided packages
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_volume(name: &str, settings: &Settings, ui: &dyn Interaction) -> Option<Volume> {
    match Volume::resolve_in(name, &settings.volumes_dir) {
        Ok(volume) => Some(volume),
        Err(e) => {
            info!("{}", e);
            ui.notice(Tone::Alert, "Volume is not mounted, or its name is invalid.");
            None
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::from_env();
    if let Some(staging_dir) = cli.staging_dir {
        settings.staging_root = staging_dir;
    }

    let ui = TerminalInteraction::new();
    let db = Pkgutil::new(&settings.pkgutil);
    let remover = Remover::new(&db, &ui, &settings.staging_root);

    match cli.command {
        Some(Commands::List { volume, json }) => {
            let Some(volume) = resolve_volume(&volume, &settings, &ui) else {
                return Ok(ExitCode::FAILURE);
            };
            let packages = pkguninst::list_installed(&db, &volume)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&packages)?);
                return Ok(ExitCode::SUCCESS);
            }

            ui.notice(Tone::Plain, "Volume:");
            ui.notice(Tone::Success, &volume.to_string());
            if packages.is_empty() {
                ui.notice(Tone::Alert, "No packages found on specified volume.");
            } else {
                ui.notice(Tone::Plain, "Installed Packages:");
                ui.notice(Tone::Success, &packages.join("\n"));
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Files { id, volume, json }) => {
            let Some(volume) = resolve_volume(&volume, &settings, &ui) else {
                return Ok(ExitCode::FAILURE);
            };
            let contents = pkguninst::inspect_package(&db, &volume, &id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&contents)?);
                return Ok(ExitCode::SUCCESS);
            }

            for file in &contents.files {
                println!("{}", file.display());
            }
            for dir in &contents.directories {
                println!("{}/", dir.display());
            }
            println!(
                "\nTotal: {} file(s), {} directory(ies)",
                contents.files.len(),
                contents.directories.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Remove {
            volume,
            ids,
            regex,
            force,
            quiet,
        }) => {
            let selector = match PackageSelector::from_args(&ids, regex.as_deref()) {
                Ok(selector) => selector,
                Err(e) => {
                    ui.notice(Tone::Alert, &e.to_string());
                    return Ok(ExitCode::FAILURE);
                }
            };

            let privilege = PrivilegeLevel::current();
            let sip = Csrutil::new(&settings.csrutil).sip_state();
            let Some(volume) = resolve_volume(&volume, &settings, &ui) else {
                return Ok(ExitCode::FAILURE);
            };

            let options = RemovalOptions {
                volume,
                force,
                quiet,
            };
            let report = remover.run_batch(&selector, &options, privilege, sip)?;

            let failed = report.failed().count();
            info!(
                "Batch finished: {} removed, {} failed",
                report.removed_count(),
                failed
            );
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(Commands::Interactive { force }) => {
            remover.run_interactive(PrivilegeLevel::current(), &settings.volumes_dir, force)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            remover.run_interactive(PrivilegeLevel::current(), &settings.volumes_dir, false)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "pkguninst", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
