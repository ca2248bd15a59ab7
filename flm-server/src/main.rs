//! flm-server: face label migration service
//!
//! Matches the legacy face database against the modern photo library and
//! writes names back through the modern server's REST API.

use anyhow::Result;
use clap::Parser;
use flm_common::config::{load_or_default, locate_config_file, CliOverrides, Settings, SettingsContext};
use flm_server::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "flm-server", version, about = "Face label migration server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Legacy SQLite face database
    #[arg(long)]
    legacy_db: Option<PathBuf>,

    #[arg(long)]
    db_host: Option<String>,

    #[arg(long)]
    db_port: Option<u16>,

    #[arg(long)]
    db_name: Option<String>,

    #[arg(long)]
    db_user: Option<String>,

    /// Base URL of the modern server, e.g. http://localhost:2283
    #[arg(long)]
    api_url: Option<String>,

    /// Listen address
    #[arg(long, env = "FLM_BIND")]
    bind: Option<String>,

    /// Log filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[arg(long, env = "FLM_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            legacy_db: self.legacy_db.clone(),
            modern_db_host: self.db_host.clone(),
            modern_db_port: self.db_port,
            modern_db_name: self.db_name.clone(),
            modern_db_user: self.db_user.clone(),
            modern_api_url: self.api_url.clone(),
            bind: self.bind.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = locate_config_file(args.config.as_deref());
    let toml = load_or_default(config_path.as_deref())?;
    let settings = Settings::resolve(&args.overrides(), &toml)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting flm-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file, using environment and defaults"),
    }
    info!("Legacy database: {}", settings.legacy_db.display());
    info!("Modern database: {}", settings.modern_db.display_url());
    info!("Modern API: {}", settings.modern_api.url);
    if settings.modern_api.api_key.is_empty() {
        info!("No modern API key configured; write-back requests will be rejected upstream");
    }

    let bind = settings.bind.clone();
    let http = reqwest::Client::builder().build()?;
    let state = AppState::new(SettingsContext::new(settings), http);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("flm-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
