//! Bank-link service - main application entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Build upstream clients sharing one HTTP client
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::sync::Arc;
use std::time::Duration;

use bank_link_server::{
    app,
    clients::{self, dwolla::DwollaClient, identity::AppwriteClient, plaid::PlaidClient},
    config, db,
    services::{bank_store::PgBankAccountStore, user_service::PgUserStore},
    state::AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(
        plaid_env = ?config.plaid.env,
        dwolla_env = ?config.dwolla.env,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.server.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let http = clients::http_client(Duration::from_secs(config.server.http_timeout_secs))?;

    let state = AppState {
        pool: pool.clone(),
        identity: Arc::new(AppwriteClient::new(http.clone(), config.identity.clone())),
        plaid: Arc::new(PlaidClient::new(http.clone(), config.plaid.clone())),
        payments: Arc::new(DwollaClient::new(http, config.dwolla.clone())),
        users: Arc::new(PgUserStore::new(pool.clone())),
        banks: Arc::new(PgBankAccountStore::new(pool)),
        cookie_secure: config.server.cookie_secure,
    };

    let app = app::router(state);

    let addr = format!("0.0.0.0:{}", config.server.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
