use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logtime::api::build_router;
use logtime::api::state::AppState;
use logtime::calculate::{aggregate, seoul};
use logtime::config::AppConfig;
use logtime::intra::{IntraApi, IntraClient, LocationRange};
use logtime::models::{Location, MonthPeriod, Session};
use logtime::store::MemoryStateStore;

#[derive(Parser)]
#[command(name = "logtime")]
#[command(about = "42 Intra learning-time tracker")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Bind address (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (default from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a user's month summary as JSON
    Summary {
        /// Intra user id
        #[arg(long)]
        user_id: u64,

        /// Year (default: current year in Asia/Seoul)
        #[arg(long)]
        year: Option<i32>,

        /// Month 1-12 (default: current month in Asia/Seoul)
        #[arg(long)]
        month: Option<u32>,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    init_logging(&config.log_level, cli.json_logs);

    tracing::info!("Starting logtime v{}", env!("CARGO_PKG_VERSION"));

    let intra = IntraClient::new(&config.intra, config.redirect_uri())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let public_url = config.server.base_url.clone();

            let state = AppState::new(
                config,
                Arc::new(intra),
                Arc::new(MemoryStateStore::new()),
            )?;
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{} (public URL {})", addr, public_url);
            axum::serve(listener, app).await?;
        }
        Commands::Summary {
            user_id,
            year,
            month,
        } => {
            let tz = seoul();
            let now = Utc::now();
            let current = MonthPeriod::containing(now, &tz);
            let year = year.unwrap_or(current.year);
            let month = month.unwrap_or(current.month);
            let period =
                MonthPeriod::new(year, month).context("Month must be between 1 and 12")?;

            let range = LocationRange::for_month(period, &tz, now);
            let locations = if !range.is_empty() {
                let token = intra.request_app_token().await?;
                intra.locations(&token, user_id, &range).await?
            } else {
                tracing::warn!("{} has not started yet", period);
                Vec::new()
            };
            tracing::info!("Fetched {} locations for {}", locations.len(), period);

            let sessions: Vec<Session> =
                locations.iter().filter_map(Location::to_session).collect();
            let summary = aggregate(&sessions, period, now, &tz);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
