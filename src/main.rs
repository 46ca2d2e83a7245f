use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use locallens::{
    serve, AppState, ArticleStore, Commands, Config, GeocodeClient, NewsClient, Result,
    SnapshotScheduler,
};

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    version,
    about = "Location-aware news browsing application"
)]
struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    config: Option<PathBuf>,

    /// Path to the article data directory
    #[clap(long, value_parser)]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP server
    #[clap(short, long)]
    port: Option<u16>,

    /// Subcommands for the locallens application
    #[clap(subcommand)]
    command: Option<Commands>,
}

pub fn initialize_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() {
    initialize_logger();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Application starting up");

            let mut store = ArticleStore::new(config.clone());
            store.initialize()?;
            let store = Arc::new(store);

            let mut scheduler = SnapshotScheduler::new(config.clone(), Arc::clone(&store));
            scheduler.start()?;

            let geocode_key = config.geocode_key();
            if geocode_key.is_none() {
                warn!("No geocoding API key configured; location endpoints will fail");
            }
            let news_key = config.news_key();
            if news_key.is_none() {
                warn!("No news API key configured; the news endpoint will fail");
            }

            let state = AppState::new(
                Arc::clone(&store),
                GeocodeClient::new(geocode_key),
                NewsClient::new(news_key),
            );

            serve(&config, state).await?;

            scheduler.stop().await?;
            info!("Application shutting down");
            Ok(())
        }

        Commands::Snapshot => {
            let mut store = ArticleStore::new(config.clone());
            store.initialize()?;

            let path = store.create_snapshot()?;
            println!("Snapshot created at: {}", path.display());
            Ok(())
        }

        Commands::Config { show } => {
            if show {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}
