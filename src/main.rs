use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kurator::config::Config;
use kurator::engine::ports::{
    Clock, ConfigStore, SystemClock, UniformPicker, ViewedLinkLedger,
};
use kurator::engine::{ChannelProcessor, Coordinator, EngineSettings, Scheduler};
use kurator::generation::{DraftComposer, ImageClient};
use kurator::llm::LlmClient;
use kurator::storage::{
    self, AutopostingStore, PublicationRepo, PublicationStore, ViewedLinkStore,
};
use kurator::telegram::TelegramFetcher;

#[derive(Parser)]
#[command(
    name = "kurator",
    version,
    about = "Mines Telegram channels into moderated draft publications",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the autoposting engine until interrupted
    Run,

    /// Run a single autoposting cycle and exit
    Once,

    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Run => {
            tracing::info!(
                cycle_interval_secs = config.autoposting.cycle_interval_secs,
                "Starting autoposting engine"
            );
            run(&config).await?;
        }

        Commands::Once => {
            tracing::info!("Running a single autoposting cycle");
            once(&config).await?;
        }

        Commands::InitDb => {
            tracing::info!("Initializing database schema");
            init_db(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("kurator=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("kurator=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

/// Wire the production adapters into a scheduler
async fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let pool = storage::create_pool(&config.database).await?;

    let configs: Arc<dyn ConfigStore> = Arc::new(AutopostingStore::new(pool.clone()));
    let ledger: Arc<dyn ViewedLinkLedger> = Arc::new(ViewedLinkStore::new(pool.clone()));
    let publications: Arc<dyn PublicationRepo> = Arc::new(PublicationStore::new(pool));

    let fetcher = Arc::new(TelegramFetcher::new(&config.telegram)?);
    let llm = Arc::new(LlmClient::with_config(config.llm.clone())?);
    let images = ImageClient::new(&config.generation)?;
    let composer = Arc::new(DraftComposer::new(
        Arc::clone(&llm),
        images,
        Arc::clone(&publications),
    ));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let picker = Arc::new(UniformPicker);
    let settings = EngineSettings::from(&config.autoposting);

    let channels = ChannelProcessor::new(
        fetcher,
        Arc::clone(&ledger),
        llm,
        Arc::clone(&clock),
        settings.clone(),
    );

    let coordinator = Coordinator::new(
        channels,
        Arc::clone(&configs),
        ledger,
        composer,
        Arc::clone(&clock),
        picker,
    );

    Ok(Scheduler::new(coordinator, configs, clock, settings))
}

async fn run(config: &Config) -> Result<()> {
    let scheduler = Arc::new(build_scheduler(config).await?);

    let runner = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.start().await })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    scheduler.stop().await;
    runner.await?;

    Ok(())
}

async fn once(config: &Config) -> Result<()> {
    let scheduler = build_scheduler(config).await?;
    let stats = scheduler.run_cycle().await?;

    println!("Cycle finished");
    println!("  Selected: {}", stats.selected);
    println!("  Disabled: {}", stats.disabled);
    println!("  Not ready: {}", stats.not_ready);
    println!("  Completed: {}", stats.completed);
    println!("  Failed: {}", stats.failed);

    Ok(())
}

async fn init_db(config: &Config) -> Result<()> {
    let pool = storage::create_pool(&config.database).await?;
    storage::init_schema(&pool).await?;
    println!("Schema initialized");
    Ok(())
}
