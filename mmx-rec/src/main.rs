//! mmx-rec - Emotion-driven playlist service
//!
//! Runs the perception loop on a blocking thread (classification source →
//! stabilizer → stable-signal store) and serves the emotion, recommendation,
//! and playback endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mmx_common::config::{load_config, ConfigSource};
use mmx_common::{ProfileTable, SystemClock};
use mmx_rec::catalog::{CatalogClient, LocalCatalog};
use mmx_rec::perception::{
    ClassificationSource, IdleSource, PerceptionLoop, ReplaySource, Stabilizer, StabilizerSettings,
    StableSignalStore,
};
use mmx_rec::recommend::{RecommendationCache, Recommender, RecommenderSettings};
use mmx_rec::{build_router, AppState};

/// Command-line arguments for mmx-rec
#[derive(Parser, Debug)]
#[command(name = "mmx-rec")]
#[command(about = "Emotion-driven playlist recommendation service")]
#[command(version)]
struct Args {
    /// Config file (overrides MMX_CONFIG and the user config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "MMX_PORT")]
    port: Option<u16>,

    /// Local catalog JSON file
    #[arg(long, env = "MMX_CATALOG")]
    catalog: Option<PathBuf>,

    /// Recorded observations (JSON lines) replayed in place of a camera
    #[arg(long, env = "MMX_OBSERVATIONS")]
    observations: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_source) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting MoodMix Recommender (mmx-rec) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_source {
        ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
        source => {
            if let Some(path) = source.path() {
                info!("Config: {}", path.display());
            }
        }
    }

    let profiles = Arc::new(ProfileTable::builtin().with_overrides(config.profiles.clone()));
    info!("Emotion profiles: {}", profiles.len());

    // Catalog
    let catalog_path = args.catalog.or_else(|| config.catalog_path.clone());
    let container_name = config.recommender.container_name.clone();
    let catalog: Arc<dyn CatalogClient> = match catalog_path {
        Some(path) => Arc::new(
            LocalCatalog::from_path(&path, container_name)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        ),
        None => {
            warn!("No catalog configured; recommendations will find no tracks");
            Arc::new(LocalCatalog::empty(container_name))
        }
    };

    // Perception loop
    let observations_path = args.observations.or_else(|| config.observations_path.clone());
    let source: Box<dyn ClassificationSource> = match observations_path {
        Some(path) => {
            let replay = ReplaySource::from_path(&path)
                .with_context(|| format!("Failed to load observations {}", path.display()))?;
            info!("Replaying {} observations from {}", replay.len(), path.display());
            Box::new(replay.looping(true))
        }
        None => {
            warn!("No classification source configured; emotion will stay neutral");
            Box::new(IdleSource)
        }
    };

    let clock = Arc::new(SystemClock);
    let store = Arc::new(StableSignalStore::new());
    let stabilizer = Stabilizer::new(StabilizerSettings::from(&config.stabilizer), clock.clone());
    let perception =
        PerceptionLoop::new(source, stabilizer, Arc::clone(&store)).with_config(&config.stabilizer);

    let cancel = CancellationToken::new();
    let perception_task = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || perception.run(cancel))
    };

    // Recommender
    let cache = Arc::new(RecommendationCache::from_config(&config.recommender, clock));
    let recommender = Arc::new(Recommender::new(
        Arc::clone(&catalog),
        cache,
        profiles,
        RecommenderSettings::from(&config.recommender),
    ));

    let app = build_router(AppState::new(Arc::clone(&store), recommender, catalog));

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    let stats = perception_task
        .await
        .context("Perception loop panicked")?;
    info!(
        "Server shutdown complete ({} frames, {} emotion updates)",
        stats.frames, stats.published
    );
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
