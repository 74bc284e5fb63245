use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagehand_core::{
    load_config, validate_config, ActiveSet, ContentCatalog, FfmpegTranscoder, HttpFetcher,
    JobStatus, JobUpdateCallback, PipelineCoordinator, RemotePublisher, SqliteCatalog, StreamGate,
};
use stagehand_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file used when neither an argument nor `STAGEHAND_CONFIG` is given
const DEFAULT_CONFIG_PATH: &str = "stagehand.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Stagehand {} starting", VERSION);

    // Determine config path: first argument, then environment, then default
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STAGEHAND_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (fingerprint {})", &config_hash[..16]);

    // Stages
    let fetcher =
        HttpFetcher::new(config.fetcher.clone()).context("Failed to create HTTP fetcher")?;
    info!("Fetcher work directory: {:?}", config.fetcher.work_dir);

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    match transcoder.validate().await {
        Ok(()) => info!("Using ffmpeg at {:?}", config.transcoder.ffmpeg_path),
        Err(e) => warn!("Compress stage will fail until ffmpeg is available: {}", e),
    }

    let publisher =
        RemotePublisher::new(config.publisher.clone()).context("Failed to create publisher")?;
    if publisher.is_offline() {
        warn!(
            "No publisher credentials configured; jobs will receive {}:// placeholder references",
            config.publisher.placeholder_scheme
        );
    } else {
        info!("Publishing to {}", config.publisher.endpoint);
    }

    // Optional content catalog
    let catalog: Option<Arc<dyn ContentCatalog>> = match &config.catalog {
        Some(catalog_config) => {
            let catalog = SqliteCatalog::new(&catalog_config.path)
                .context("Failed to open content catalog")?;
            info!("Content catalog at {:?}", catalog_config.path);
            Some(Arc::new(catalog))
        }
        None => {
            info!("No content catalog configured");
            None
        }
    };

    let update_callback: JobUpdateCallback = Arc::new(|job_id: &str, status: JobStatus| {
        debug!("Job {} is now {}", job_id, status);
    });

    let mut coordinator = PipelineCoordinator::new(
        config.coordinator.clone(),
        Arc::new(fetcher),
        Arc::new(transcoder),
        Arc::new(publisher),
    )
    .with_update_callback(update_callback);
    if let Some(catalog) = catalog {
        coordinator = coordinator.with_catalog(catalog);
    }
    let coordinator = Arc::new(coordinator);
    info!(
        "Coordinator ready (lanes: download={}, compress={}, upload={})",
        config.coordinator.download_lanes,
        config.coordinator.compress_lanes,
        config.coordinator.upload_lanes
    );

    // Streams mark their id active when they start, including promotions
    let active = Arc::new(ActiveSet::new());
    let active_for_gate = Arc::clone(&active);
    let streams = Arc::new(
        StreamGate::new(config.streams.clone()).with_start_callback(move |id: &str| {
            active_for_gate.request_active(id);
        }),
    );

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        coordinator,
        streams,
        active,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Jobs still in flight are abandoned; job state is not persisted
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
