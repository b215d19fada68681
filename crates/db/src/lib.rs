//! Persistence for the content history ledger.
//!
//! Repositories are zero-sized structs with async methods over a sqlx
//! executor. The [`ledger::Ledger`] trait is what the service layer talks to;
//! [`pg::PgLedger`] backs it with Postgres and [`memory::MemoryLedger`] keeps
//! everything in process.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, LiveContent};
pub use memory::MemoryLedger;
pub use pg::PgLedger;

pub type DbPool = sqlx::PgPool;

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
