use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_image_proxy::{
    config::Config,
    database::Database,
    image_cache::ImageCacheService,
    observability::AppObservability,
    repositories::{ChannelSeaOrmRepository, ChannelStore},
    services::warm_all_channels,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "yt-image-proxy")]
#[command(version)]
#[command(about = "Disk-backed caching proxy for YouTube avatars and thumbnails")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Fetch the avatar of every channel with a thumbnail URL, then exit
    WarmChannels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("yt_image_proxy={},tower_http=trace", cli.log_level)
    } else {
        format!("yt_image_proxy={},tower_http=info", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting YT Image Proxy v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let observability = AppObservability::new("yt-image-proxy")?;

    let image_cache = Arc::new(
        ImageCacheService::new(config.image_cache.clone(), observability.image_cache.clone())
            .await
            .context("Failed to initialise image cache")?,
    );
    let channels: Arc<dyn ChannelStore> =
        Arc::new(ChannelSeaOrmRepository::new(database.connection()));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = WebServer::new(&config.web, AppState::new(image_cache, channels))?;
            server.serve().await?;
            info!("Server stopped");
        }
        Command::WarmChannels => {
            let report = warm_all_channels(&image_cache, channels.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
