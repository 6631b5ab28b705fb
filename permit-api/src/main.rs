//! # Permit API Server
//!
//! RBAC administration backend: users, roles, hierarchical menus and the
//! per-user navigation tree.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) STORE_BACKEND=memory cargo run -p permit-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use permit_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use permit_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool},
    },
    services::bootstrap::ensure_superuser,
    store::{EntityStore, MemoryStore, PgStore},
};
use sqlx::PgPool;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "permit_api=debug,permit_shared=debug,tower_http=debug".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Permit API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let (store, pool): (Arc<dyn EntityStore>, Option<PgPool>) = match config.store.backend {
        StoreBackend::Postgres => {
            let database = config
                .store
                .database
                .clone()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = create_pool(database).await?;
            run_migrations(&pool).await?;
            (Arc::new(PgStore::new(pool.clone())), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; all data is lost on shutdown");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    if let Some(bootstrap) = &config.bootstrap {
        let report = ensure_superuser(
            &store,
            &config.auth.superuser_role,
            &bootstrap.username,
            &bootstrap.password,
        )
        .await
        .context("Superuser bootstrap failed")?;

        tracing::info!(
            role_id = report.role_id,
            user_id = report.user_id,
            created_role = report.created_role,
            created_user = report.created_user,
            granted_menus = report.granted_menus,
            "Superuser bootstrap complete"
        );
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    Ok(())
}
