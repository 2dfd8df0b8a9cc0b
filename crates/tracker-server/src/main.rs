#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracker_core::IssueService;
use tracker_core::config::{ServerConfig, load_server_config};
use tracker_core::db::SqliteStore;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "trackerd: issue tracker JSON API server",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to tracker.toml in the working directory, if present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:3000.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Record store URI: sqlite::memory: or sqlite://<path>.
    #[arg(long, value_name = "URI")]
    database_uri: Option<String>,
}

impl Cli {
    /// Resolve the effective config: flags over env over file over defaults.
    fn resolve_config(
        &self,
        dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<ServerConfig> {
        let mut config = load_server_config(self.config.as_deref(), dir)?;
        config.apply_env(lookup)?;

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(uri) = &self.database_uri {
            config.database_uri.clone_from(uri);
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TRACKER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tracker=debug,info"
        } else {
            "tracker=info,warn"
        })
    });

    let format = env::var("TRACKER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = env::current_dir()?;
    let config = cli.resolve_config(&cwd, |key| env::var(key).ok())?;
    let uri = config.database()?;

    let store = SqliteStore::open(&uri).with_context(|| format!("open record store {uri}"))?;
    let app = tracker_server::router(IssueService::new(store));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;

    info!("stopped");
    Ok(())
}
