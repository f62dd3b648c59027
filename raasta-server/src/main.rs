//! raasta-server - traffic report service
//!
//! Accepts geotagged traffic reports with an optional photo and serves listing,
//! engagement and moderation endpoints over SQLite.

use anyhow::{Context, Result};
use clap::Parser;
use raasta_common::{db, LocalPhotoStore};
use raasta_server::config::Args;
use raasta_server::{build_router, AppState, ServerConfig, TokenTable};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting raasta-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ServerConfig::load(&args).context("Failed to load configuration")?;

    std::fs::create_dir_all(&config.root_folder).with_context(|| {
        format!("Failed to create root folder {}", config.root_folder.display())
    })?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match db::init_database(&db_path).await {
        Ok(pool) => {
            info!("Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let sessions = TokenTable::new(config.sessions.clone());
    if sessions.is_empty() {
        warn!("No sessions configured; every authenticated endpoint will answer 401");
    } else {
        info!("Loaded {} session tokens", sessions.len());
    }

    let photos_dir = config.photos_dir();
    let state = AppState::new(
        pool,
        Arc::new(LocalPhotoStore::new(&photos_dir)),
        Arc::new(sessions),
        config.max_photo_bytes,
    )
    .with_photo_dir(&photos_dir);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("raasta-server listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
