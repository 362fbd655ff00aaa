// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use anyhow::Context;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::adapters::build_registry;
use crate::infrastructure::asset_cache::{AssetCache, CacheStorage, DirectoryOrigin};
use crate::infrastructure::canvas::Canvas;
use crate::infrastructure::config::load_config;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,iot_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = load_config().context("loading dashboard configuration")?;

    // Adapters (infrastructure layer)
    let adapters = build_registry(&config)?;

    // Dashboard session (application layer)
    let dashboard = DashboardService::new(
        adapters,
        Box::new(Canvas::new()),
        config.dashboard.settings()?,
    );

    // Offline shell cache
    let assets = AssetCache::new(
        config.assets.cache_name.clone(),
        config.assets.manifest.clone(),
        CacheStorage::default(),
        Arc::new(DirectoryOrigin::new(&config.assets.dir)),
    );
    if let Err(e) = assets.install().await {
        tracing::warn!(cache = assets.name(), "app shell not cached: {e}");
    }
    assets.activate().await;

    let state = Arc::new(AppState { dashboard, assets });

    // Build router (presentation layer)
    let app = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!("Starting iot-dashboard on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
