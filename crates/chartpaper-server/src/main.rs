use chartpaper_core::config::default_config_path;
use chartpaper_core::{Catalog, CatalogConfig};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "chartpaper-server", about = "Chartpaper chart catalog HTTP API")]
struct Cli {
    /// Path to chartpaper.toml (default: ~/.config/chartpaper/chartpaper.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on (overrides `server.port`).
    #[arg(long)]
    port: Option<u16>,

    /// Worker threads (overrides `server.workers`).
    #[arg(long)]
    workers: Option<usize>,

    /// Catalog store directory (overrides `store_dir` and CHARTPAPER_STORE).
    #[arg(long)]
    store: Option<PathBuf>,

    /// Rendering engine: helm or mock (overrides `engine.kind`).
    #[arg(long)]
    engine: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match CatalogConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(store) = cli.store {
        config.store_dir = store;
    }
    if let Some(engine) = cli.engine {
        config.engine.kind = engine;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(workers) = cli.workers {
        config.server.workers = workers;
    }

    let addr = format!("{}:{}", cli.bind, config.server.port);
    let workers = config.server.workers;
    info!("starting chartpaper-server on {addr}");
    info!("store directory: {}", config.store_dir.display());

    let catalog = match Catalog::open(config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("cannot open catalog: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !catalog.engine().available() {
        warn!(
            "{} engine is not available; chart fetches will fail",
            catalog.engine().name()
        );
    }

    match chartpaper_server::run_server(&catalog, &addr, workers) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
