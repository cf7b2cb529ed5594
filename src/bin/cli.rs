//! Notice watcher CLI
//!
//! Local execution entry point, meant to be run from cron or a CI schedule.
//! For AWS Lambda, use `watcher-lambda`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use watcher::{
    error::Result,
    models::{Config, NotificationMessage},
    pipeline::Watcher,
    services::{BrowserFallback, LogNotifier, Notifier, TelegramNotifier, build_fetcher},
    storage::{DigestStore, LocalDigestStore},
};

/// Notice watcher - reports changes to a web page over Telegram
#[derive(Parser, Debug)]
#[command(name = "watcher", version, about = "Notice page change watcher")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "watcher.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the page once and notify if it changed (default)
    Check {
        /// Log the message instead of sending it; never update the digest
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration
    Validate,

    /// Show target and stored digest
    Info,

    /// Forget the stored digest so the next check reports a change
    Reset,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load `.env`, the config file and environment overrides.
fn load_config(path: &Path) -> Config {
    match dotenvy::dotenv() {
        Ok(env_path) => log::debug!("Loaded environment from {}", env_path.display()),
        Err(e) if e.not_found() => log::debug!("No .env file found"),
        Err(e) => log::warn!("Failed to read .env file: {}", e),
    }

    let mut config = Config::load_or_default(path);
    config.apply_process_env();
    config
}

/// Run one watch pass. Always returns normally; failures are logged and alerted.
async fn run_check(config: &Config, dry_run: bool) {
    let store = LocalDigestStore::new(&config.storage.digest_path);
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(LogNotifier)
    } else {
        match TelegramNotifier::new(&config.notifier) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                log::error!("Could not set up Telegram notifier: {}", e);
                return;
            }
        }
    };

    let setup = config.validate().and_then(|()| build_fetcher(config));
    let fetcher = match setup {
        Ok(fetcher) => fetcher,
        Err(e) => {
            log::error!("Could not set up watcher: {}", e);
            let delivery = notifier
                .deliver(&NotificationMessage::crash(e.to_string()))
                .await;
            log::debug!("Crash alert: {:?}", delivery);
            return;
        }
    };

    let watcher = Watcher::new(config, fetcher, Box::new(store), notifier);
    let report = watcher.check().await;
    if let Some(outcome) = &report.outcome {
        log::info!("Outcome: {}", outcome.label());
    }
}

async fn show_info(config: &Config) -> Result<()> {
    let store = LocalDigestStore::new(&config.storage.digest_path);
    let url = if config.target.url.is_empty() {
        "<not set>"
    } else {
        config.target.url.as_str()
    };

    log::info!("Target: {}", url);
    log::info!("Digest file: {}", store.location());
    log::info!("Stored digest: {}", store.load().await?);
    log::info!(
        "Telegram: {}",
        if config.notifier.is_configured() {
            "configured"
        } else {
            "not configured"
        }
    );
    log::info!("Browser fallback: {}", BrowserFallback::for_config(config));
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config);

    match cli.command.unwrap_or(Command::Check { dry_run: false }) {
        Command::Check { dry_run } => {
            run_check(&config, dry_run).await;
            log::info!("Done!");
            ExitCode::SUCCESS
        }

        Command::Validate => match config.validate() {
            Ok(()) => {
                log::info!("✓ Config OK");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Config validation failed: {}", e);
                ExitCode::FAILURE
            }
        },

        Command::Info => match show_info(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        },

        Command::Reset => {
            let store = LocalDigestStore::new(&config.storage.digest_path);
            match store.clear().await {
                Ok(()) => {
                    log::info!("Cleared digest at {}", store.location());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("Could not clear digest: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
