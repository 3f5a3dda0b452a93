//! PostgreSQL pool and migrations for the `users` and `bank_accounts` tables.

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

pub type DbPool = Pool<Postgres>;

/// Connections kept by the pool. Each request needs at most one at a time.
const MAX_CONNECTIONS: u32 = 5;

/// Connect to PostgreSQL.
///
/// # Errors
///
/// Fails if the URL is invalid or the server refuses the connection.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/`, embedded at compile time.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
