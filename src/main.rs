//! Galactic Core - metadata catalog API
//!
//! Registers data providers, clients, domains, schemas, file formats and
//! data asset instances, and keeps the pipeline task log that ingestion
//! and transform services report into.
//!
//! All `/v1` routes require a Cognito access token. Nested instance
//! documents are uploaded to `/v1/data-assets/instances/upsert` and
//! reconciled against the catalog in a single transaction.

mod auth;
mod config;
mod db;
mod error;
mod models;
mod openapi;
mod pagination;
mod routes;
mod service;
mod state;

use crate::auth::CognitoAuth;
use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Galactic Core...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let pool = db::create_pool(&settings.database).await?;
    info!("✅ Database pool created successfully");

    db::migrations::run(&pool).await?;

    let auth = Arc::new(CognitoAuth::new(&settings.auth)?);
    info!(issuer = %settings.auth.token_issuer(), "🔐 Token validation configured");

    let openapi = openapi::openapi_json(&settings.docs, &settings.auth)?;
    let state = Arc::new(AppState::new(pool, auth, openapi));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    if settings.docs.enable_openapi && settings.docs.enable_swagger {
        info!("📚 API docs at http://{}/docs/", addr);
    }

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,galactic_core=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
