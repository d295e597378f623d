//! snapcart-server - demo retail checkout backend
//!
//! Serves the item/basket API, classifies product photos through the vision
//! service, and streams item additions to connected viewers over SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use snapcart_common::config::{ConfigOverrides, ServerConfig};
use snapcart_common::{db, Catalog, EventBroadcaster};
use snapcart_server::vision::{Classifier, GoogleVisionClient};
use snapcart_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for snapcart-server
#[derive(Parser, Debug)]
#[command(name = "snapcart-server")]
#[command(about = "Checkout backend with photo item recognition")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "SNAPCART_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "SNAPCART_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SNAPCART_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "SNAPCART_DATABASE")]
    database: Option<PathBuf>,

    /// Catalog override file (TOML)
    #[arg(long, env = "SNAPCART_CATALOG")]
    catalog: Option<PathBuf>,

    /// Google Cloud Vision API key
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "snapcart_server=info,snapcart_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting snapcart-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .apply_overrides(ConfigOverrides {
            host: args.host,
            port: args.port,
            database_path: args.database,
            catalog_path: args.catalog,
            vision_api_key: args.vision_api_key,
        });

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };
    info!("Catalog: {} items", catalog.len());

    info!("Database path: {}", config.database_path.display());
    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    db::seed_catalog(&pool, &catalog)
        .await
        .context("Failed to seed catalog")?;

    let vision = GoogleVisionClient::new(&config.vision).context("Failed to create vision client")?;
    if !vision.is_configured() {
        warn!("No vision API key configured; /classify-item will answer 503");
    }
    let classifier = Classifier::new(Arc::new(vision));

    let broadcaster = EventBroadcaster::new(config.event_queue_capacity);
    info!(
        "Event broadcaster initialized (queue capacity {})",
        broadcaster.queue_capacity()
    );

    let state = AppState::new(pool.clone(), catalog, classifier, broadcaster.clone());
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("snapcart-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(broadcaster))
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then close every live event stream
///
/// Open SSE connections would otherwise keep graceful shutdown waiting forever.
async fn shutdown_signal(broadcaster: EventBroadcaster) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    broadcaster.shutdown();
}
