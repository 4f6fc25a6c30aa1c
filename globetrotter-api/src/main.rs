//! # GlobeTrotter API Server
//!
//! HTTP backend for GlobeTrotter: account signup and login with sequential
//! user IDs, and trip storage.
//!
//! ## Usage
//!
//! ```bash
//! # In-memory store (development)
//! cargo run -p globetrotter-api
//!
//! # PostgreSQL store
//! STORE_BACKEND=postgres DATABASE_URL=postgresql://... cargo run -p globetrotter-api
//! ```

use globetrotter_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use globetrotter_shared::{
    db::{self, pool::DatabaseConfig},
    store::{memory::MemoryStore, postgres::PgDocumentStore, DocumentStore},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "globetrotter_api=debug,globetrotter_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "GlobeTrotter API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let (store, pg_store) = open_store(&config).await?;
    tracing::info!(backend = store.backend(), "Document store ready");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pg_store) = pg_store {
        db::pool::close_pool(pg_store.pool().clone()).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Opens the configured store; the PostgreSQL handle is returned separately
/// so its pool can be closed on shutdown
async fn open_store(
    config: &Config,
) -> anyhow::Result<(Arc<dyn DocumentStore>, Option<PgDocumentStore>)> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok((Arc::new(MemoryStore::new()), None))
        }
        StoreBackend::Postgres => {
            let database = config
                .store
                .database
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("postgres backend selected without DATABASE_URL"))?;

            let pool = db::pool::create_pool(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..DatabaseConfig::default()
            })
            .await?;
            db::migrations::run_migrations(&pool).await?;

            let pg_store = PgDocumentStore::new(pool);
            Ok((Arc::new(pg_store.clone()), Some(pg_store)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
