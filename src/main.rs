//! foldersort CLI
//!
//! Watches the configured source folder, or sorts it once.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foldersort::notifications::DesktopNotifier;
use foldersort::sorter::{ConfigHandle, Listeners, Sorter};
use foldersort::watcher::FileChangeWatcher;
use foldersort::{Config, RuleOrigin, ServiceState, SortService};

#[derive(Parser, Debug)]
#[command(name = "foldersort")]
#[command(author, version, about = "Sort files dropped into a folder by extension")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Watch the source folder and sort new files (default)
    Watch,

    /// Sort existing files once (dry-run by default)
    Sort {
        /// Actually move files (not just dry-run)
        #[arg(long)]
        apply: bool,

        /// Folder to sort instead of the configured source folder
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// List active rules in priority order
    List,

    /// Validate config file
    Check,

    /// Write a config file with the stock categories
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Export settings to a portable JSON file
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Import settings from an exported JSON file
    Import {
        /// Exported file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool, config_level: &str) {
    let log_level = if verbose { "debug" } else { config_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("FOLDERSORT_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .clone()
        .or_else(Config::default_path)
        .context("Could not determine config path")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(&cli)?;

    let config = match Config::load(Some(&path)) {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Some(Commands::Check)) => {
            eprintln!("✗ Config error: {:#}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };
    init_logging(cli.verbose, &config.general.log_level);

    match cli.command {
        None | Some(Commands::Watch) => run_watch(path, config).await?,
        Some(Commands::Sort { apply, dir }) => run_sort(config, dir, apply)?,
        Some(Commands::List) => {
            let rules = foldersort::RuleSet::from_config(&config);
            println!("Rules:");
            for (i, rule) in rules.rules().iter().enumerate() {
                let kind = match rule.origin {
                    RuleOrigin::BuiltIn => "built-in",
                    RuleOrigin::Custom { .. } => "custom",
                };
                println!(
                    "  [{}] {} <- {} ({})",
                    i + 1,
                    rule.label(),
                    rule.extensions.join(" "),
                    kind
                );
            }
        }
        Some(Commands::Check) => {
            println!("✓ Config is valid: {}", path.display());
            println!("  source: {}", display_folder(&config.source_folder));
            println!("  target: {}", display_folder(&config.base_target_folder));
            println!("  {} file rules", config.file_rules.len());
            println!("  {} custom categories", config.custom_categories.len());
        }
        Some(Commands::Init { force }) => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::with_default_rules().save(Some(&path))?;
            println!("Wrote {}", path.display());
        }
        Some(Commands::Export { file }) => {
            config.export(&file)?;
            println!("Exported settings to {}", file.display());
        }
        Some(Commands::Import { file }) => {
            let imported = config.import(&file)?;
            imported.save(Some(&path))?;
            println!("Imported settings into {}", path.display());
        }
    }

    Ok(())
}

fn display_folder(path: &std::path::Path) -> String {
    if path.as_os_str().is_empty() {
        "(unset)".to_string()
    } else {
        path.display().to_string()
    }
}

fn build_sorter(config: Config) -> Arc<Sorter> {
    let handle = ConfigHandle::new(config);
    let listeners = Listeners::new().with(DesktopNotifier::new(handle.clone()));
    Arc::new(Sorter::new(handle, Arc::new(listeners)))
}

fn run_sort(config: Config, dir: Option<PathBuf>, apply: bool) -> Result<()> {
    let sorter = build_sorter(config);
    let snapshot = sorter.config().load();
    if !snapshot.is_configured() && dir.is_none() {
        anyhow::bail!("Source and target folders must be set (run `foldersort check`)");
    }
    let dir = dir.unwrap_or_else(|| snapshot.source_folder().to_path_buf());

    println!("Processing: {}", dir.display());
    if apply {
        let summary = sorter.sort_existing(&dir)?;
        println!(
            "  {} scanned, {} moved, {} failed",
            summary.scanned, summary.moved, summary.failed
        );
    } else {
        for planned in sorter.plan_existing(&dir)? {
            println!(
                "  [dry-run] {} -> {}",
                planned.path.display(),
                planned.destination_folder.display()
            );
        }
    }
    Ok(())
}

async fn run_watch(path: PathBuf, config: Config) -> Result<()> {
    let sorter = build_sorter(config);
    let mut service = SortService::new(sorter);

    if let Err(e) = service.start() {
        error!("Error starting file watcher: {:#}", e);
    }

    let (_config_watcher, mut reloads) = match FileChangeWatcher::start(&path) {
        Ok((watcher, rx)) => (Some(watcher), Some(rx)),
        Err(e) => {
            error!("Config reload disabled: {:#}", e);
            (None, None)
        }
    };

    if service.state() == ServiceState::Idle {
        info!("Idle until source and target folders are configured");
    }
    info!("Running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            Some(()) = recv_reload(&mut reloads) => {
                // Editors write in several steps; wait for them to finish
                tokio::time::sleep(Duration::from_millis(200)).await;
                if let Some(rx) = reloads.as_mut() {
                    while rx.try_recv().is_ok() {}
                }

                match Config::load(Some(&path)) {
                    Ok(config) => {
                        info!("Configuration changed, reloading");
                        service.apply_config(config);
                    }
                    Err(e) => error!("Keeping previous configuration: {:#}", e),
                }
            }
        }
    }

    info!("Shutting down...");
    service.stop();
    Ok(())
}

async fn recv_reload(rx: &mut Option<tokio::sync::mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
