mod api;
mod config;
mod storage;

use crate::api::{build_router, AppState};
use crate::config::{AppConfig, StorageBackend};
use crate::storage::{JsonlStore, MongoStore, ProductStore};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("🚀 Starting Product Catalog API");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Storage: {}", config.storage.backend);
    info!("   - Collection: {}", config.storage.collection);
    info!("   - Page size: {} (max {})", config.pagination.default_limit, config.pagination.max_limit);
    info!("   - Server: {}", config.bind_addr());

    // Connect storage and wait for it before accepting requests
    info!("💾 Connecting to product storage...");
    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("❌ Storage connection failed: {:#}", e);
            return Err(e);
        }
    };
    info!("✅ Product storage ready");

    let state = AppState {
        store,
        pagination: config.pagination,
    };
    let app = build_router(state, config.server.enable_cors);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /health                - Readiness check");
    info!("   GET  /api/products          - List products (code, name, brand, page, limit)");
    info!("   GET  /api/products/{{code}}   - Get product by code");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Build the configured store and confirm it answers
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProductStore>> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Mongodb => {
            let uri = storage.uri.as_deref().context("MONGODB_URI is not set")?;
            let timeout = Duration::from_secs(storage.connect_timeout_secs);

            let store = MongoStore::connect(uri, storage.database.as_deref(), &storage.collection, timeout)
                .await
                .context("Invalid MongoDB connection string")?;

            store.ping().await.context("MongoDB ping failed")?;

            info!("   - Connected to MongoDB database {:?}", store.database());
            Ok(Arc::new(store))
        }
        StorageBackend::Jsonl => {
            let path = storage.jsonl_path.as_deref().context("PRODUCTS_JSONL is not set")?;
            let store = JsonlStore::load(path)?;
            info!("   - Loaded {} products from {:?}", store.len(), path);
            Ok(Arc::new(store))
        }
    }
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
