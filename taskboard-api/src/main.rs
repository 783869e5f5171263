//! # Taskboard API Server
//!
//! REST backend for the task manager.
//!
//! ## Usage
//!
//! ```bash
//! # Postgres (default)
//! DATABASE_URL=postgres://localhost/taskboard JWT_SECRET=... cargo run -p taskboard-api
//!
//! # In-memory demo mode
//! STORE_BACKEND=memory SEED_DEMO_DATA=true JWT_SECRET=... cargo run -p taskboard-api
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskboard_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StoreBackend},
};
use taskboard_shared::{
    db::{
        migrations::{get_migration_status, run_migrations},
        pool,
    },
    demo,
    store::{memory::MemoryStore, postgres::PgStore, SharedStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = open_store(&config).await?;
    let bind_address = config.bind_address();

    let app = build_router(AppState::new(store.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "taskboard_api=debug,taskboard_shared=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let database = config
                .store
                .database
                .as_ref()
                .context("DATABASE_URL is required for the postgres backend")?;

            let pool = pool::create_pool(pool::DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;

            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let status = get_migration_status(&pool)
                .await
                .context("Failed to read migration status")?;
            tracing::info!(
                applied_migrations = status.applied_migrations,
                latest_version = ?status.latest_version,
                "Database schema ready"
            );

            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            let store = MemoryStore::new();

            if config.store.seed_demo_data {
                demo::seed(&store)
                    .await
                    .context("Failed to seed demo data")?;
                tracing::info!(
                    password = demo::DEMO_PASSWORD,
                    "Demo data seeded (admin@example.com, john@example.com, sarah@example.com)"
                );
            }

            Ok(Arc::new(store))
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections...");
}
