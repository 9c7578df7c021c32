use clap::Parser;
use playgen::cli::Cli;
use playgen::config::AppConfig;
use playgen::engine::GtpEngine;
use playgen::error::Result;
use playgen::pool::PoolCoordinator;
use playgen::sync::{ArtifactSynchronizer, RetryPolicy};
use playgen::transport::HttpTransport;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(e) = run().await {
        // Fatal conditions (server version skew, exhausted retries) cannot be
        // repaired locally; exit non-zero for the process supervisor.
        error!("exiting: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = AppConfig::load(&cli.config)?;
    cli.apply(&mut cfg);

    info!(
        "playgen v{} starting against {}",
        cfg.server.client_version, cfg.server.base_url
    );

    let transport = HttpTransport::new(&cfg.server.base_url)?;
    let uploader = Arc::new(transport.clone());
    let synchronizer = ArtifactSynchronizer::new(
        transport,
        cfg.server.client_version,
        cfg.paths.data_dir.clone(),
        RetryPolicy::from(&cfg.sync),
    );
    let engine = Arc::new(GtpEngine::new(&cfg.engine));
    let coordinator = PoolCoordinator::new(&cfg, synchronizer, engine, uploader);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, finishing in-flight games");
            let _ = shutdown_tx.send(true);
        }
    });

    coordinator.run(shutdown_rx).await
}
