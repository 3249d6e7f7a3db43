// smartsports-edge - Offline-first caching router for the SmartSports web app
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use smartsports_edge::cache::open_storage;
use smartsports_edge::cli::Args;
use smartsports_edge::config::AppConfig;
use smartsports_edge::router::{CacheRouter, HttpNetwork, Network};
use smartsports_edge::server::{create_router, AppState};
use smartsports_edge::utils::logging;
use smartsports_edge::worker::{ClientRegistry, InstallOutcome, Lifecycle, PushBridge, SyncBridge};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting smartsports-edge v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    // Phase 3: Open partitions and the upstream client
    let storage = open_storage(&config.cache)?;
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(&config.upstream)?);
    let router = CacheRouter::new(&config.cache, &config.upstream, storage, network.clone())?;
    info!(
        "Routing for {} with partitions {:?}",
        router.origin(),
        router.partitions().names()
    );

    // Phase 4: Wire the worker flows
    let clients = ClientRegistry::new();
    let lifecycle = Lifecycle::new(router.clone(), clients.clone(), &config.cache);
    let push = PushBridge::new(
        config.notifications.clone(),
        router.origin().clone(),
        clients.clone(),
    );
    let sync = SyncBridge::new(&config.sync, router.origin(), network, clients.clone())?;

    // Phase 5: Install in the background so the server answers immediately
    if args.skip_install {
        info!("Skipping precache install");
        lifecycle.activate()?;
    } else {
        let installer = lifecycle.clone();
        tokio::spawn(async move {
            match installer.install().await {
                Ok(InstallOutcome::Seeded { entries }) => {
                    info!("Worker {} ready with {} precached assets", installer.version(), entries)
                }
                Ok(InstallOutcome::SeedFailed { reason }) => {
                    warn!("Worker {} serving existing partitions only: {}", installer.version(), reason)
                }
                Err(e) => warn!("Worker stays inactive, requests pass straight through: {}", e),
            }
        });
    }

    // Phase 6: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState {
        config: Arc::new(config),
        router,
        lifecycle,
        clients,
        push,
        sync,
    });

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 7: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
