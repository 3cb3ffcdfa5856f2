//! jobwatch CLI
//!
//! Long-running watcher for a careers listing page.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobwatch::{
    error::{AppError, Result},
    models::{Config, JobRecord},
    notify::NotifyContext,
    pipeline::{self, Watcher},
    storage::{LocalStateStore, StateStore},
    utils::display,
};

/// jobwatch - new job posting notifier
#[derive(Parser, Debug)]
#[command(
    name = "jobwatch",
    version,
    about = "Watches a careers page and notifies about new job postings"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Watch on the configured interval until Ctrl-C
    Run {
        /// Override schedule.interval_minutes
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Run a single cycle and exit
    Once,

    /// Validate configuration and show sink status
    Validate,

    /// Show the persisted state
    Info,

    /// Send a sample posting through all enabled sinks
    TestNotify,

    /// Delete the persisted state; the next cycle is treated as a first run
    Reset,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::Init { force } = cli.command {
        if cli.config.exists() && !force {
            return Err(AppError::config(format!(
                "{} already exists (use --force to overwrite)",
                cli.config.display()
            )));
        }
        Config::default().save(&cli.config)?;
        log::info!("Wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides();
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Init { .. } => {}

        Command::Run { interval } => {
            if let Some(minutes) = interval {
                config.schedule.interval_minutes = minutes;
            }
            config.validate()?;

            let watcher = Watcher::from_config(&config)?;
            log::info!(
                "Watching {} every {} minutes (Ctrl-C to stop)",
                config.scraper.url,
                config.schedule.interval_minutes
            );

            let shutdown = pipeline::shutdown_on_ctrl_c();
            let summary = pipeline::run_scheduled(&watcher, &config.schedule, shutdown).await;
            log::info!(
                "Stopped after {} cycles ({})",
                summary.cycles,
                summary.state.state.describe()
            );
        }

        Command::Once => {
            config.validate()?;

            let watcher = Watcher::from_config(&config)?;
            let previous = watcher.load_state().await;
            let shutdown = pipeline::shutdown_on_ctrl_c();
            let report = watcher.run_cycle(&previous, &shutdown).await;

            println!("{}", display::summary("Cycle", &report.summary_items()));
            for sink in &report.reports {
                println!("{}", display::sub_item(&sink.to_string()));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            let watcher = Watcher::from_config(&config)?;
            log::info!("✓ Config OK (scraper selectors compiled)");

            let enabled = watcher.sinks().iter().filter(|s| s.is_enabled()).count();
            for sink in watcher.sinks() {
                let mark = if sink.is_enabled() { "✓" } else { "✗" };
                log::info!("{} {:<8} {}", mark, sink.name(), sink.target());
            }
            if enabled == 0 {
                log::warn!("No notification sinks are enabled");
            }
        }

        Command::Info => {
            let store = LocalStateStore::new(&config.storage.state_file);
            match store.load().await? {
                Some(document) => println!(
                    "{}",
                    display::summary(
                        "State",
                        &[
                            ("File", store.path().display().to_string()),
                            ("Updated", document.updated_at.to_rfc3339()),
                            ("Postings", document.record_count.to_string()),
                            ("Detector", document.state.describe()),
                        ]
                    )
                ),
                None => log::info!("No state found yet at {}", store.path().display()),
            }
        }

        Command::TestNotify => {
            let watcher = Watcher::from_config(&config)?;
            let sample = vec![JobRecord::new(
                "Test Posting (jobwatch)",
                config.scraper.url.clone(),
                "Testing",
                "Anywhere",
            )];
            let ctx = NotifyContext::new(config.detector.keywords.clone());

            let reports =
                pipeline::notify(&sample, watcher.sinks(), &ctx, watcher.sink_timeout()).await;
            if reports.is_empty() {
                return Err(AppError::config("No notification sinks are enabled"));
            }
            for report in &reports {
                println!("{}", display::sub_item(&report.to_string()));
            }
        }

        Command::Reset => {
            let store = LocalStateStore::new(&config.storage.state_file);
            store.clear().await?;
            log::info!("State cleared at {}", store.path().display());
        }
    }

    Ok(())
}
