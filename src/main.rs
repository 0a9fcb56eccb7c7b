//! Batchboard server and CLI
//!
//! - `batchboard serve` runs the HTTP API and change feed
//! - `batchboard seed` creates the default rows in the SQLite store
//! - `batchboard status` queries a running server's health endpoint
//! - `batchboard init-config` writes a commented default config file

use anyhow::{bail, Context};
use batchboard::api::{serve, AppState};
use batchboard::config::{generate_default_config, Config, LoggingConfig, StoreBackend};
use batchboard::store::SqliteStore;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "batchboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live batch demand, investment details and documents with an admin panel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server
    Serve,

    /// Create the default batch and details rows in the SQLite store
    Seed,

    /// Show a running server's health
    Status {
        /// API server URL
        #[arg(long, default_value = "http://localhost:8082")]
        api_url: String,
    },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig { output } => init_config(output.as_deref()),
        Commands::Status { api_url } => {
            init_logging(&LoggingConfig::default());
            status(&api_url).await
        }
        Commands::Serve => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(&config.logging);
            run_server(config).await
        }
        Commands::Seed => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(&config.logging);
            seed(&config)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::load_default()),
    }
}

/// Initialize tracing with `RUST_LOG` taking precedence over the config level
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("batchboard={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Batchboard v{}", env!("CARGO_PKG_VERSION"));

    if config.admin.credentials().uses_default_password() {
        tracing::warn!("Admin password is the built-in default; set ADMIN_PASSWORD");
    }

    let api_config = config.api.clone();
    let state = AppState::from_config(config).context("opening store")?;

    serve(state, &api_config).await?;
    tracing::info!("Batchboard stopped");
    Ok(())
}

fn seed(config: &Config) -> anyhow::Result<()> {
    if config.store.backend != StoreBackend::Sqlite {
        bail!("seed only applies to the sqlite store backend");
    }

    let path = Path::new(&config.store.sqlite_path);
    let store = SqliteStore::open(path)
        .with_context(|| format!("opening store at {}", path.display()))?;

    if store.seed_defaults()? {
        tracing::info!(path = %path.display(), "Seeded default batch and details");
    } else {
        tracing::info!(path = %path.display(), "Store already has an active batch; nothing to do");
    }
    Ok(())
}

async fn status(api_url: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", api_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("connecting to {}", url))?;

    let body: serde_json::Value = response.json().await.context("decoding health response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn init_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote default config to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
