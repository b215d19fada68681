//! One-shot integrity audit of every stored version chain.
//!
//! Connects to `DATABASE_URL`, applies pending migrations, then checks each
//! entity's chain for numbering gaps, duplicate numbers and broken pointers.
//! Exits non-zero when any chain is unhealthy.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_db::PgLedger;
use scribe_history::{ContentHistory, HistoryConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe_audit=info,scribe_history=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = HistoryConfig::from_env().expect("Invalid history configuration");
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
        .map(|v| v.parse().expect("DATABASE_MAX_CONNECTIONS must be a valid u32"))
        .unwrap_or(scribe_db::DEFAULT_MAX_CONNECTIONS);

    // --- Database ---
    let pool = scribe_db::create_pool(&database_url, max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!(max_connections, "Database connection pool created");

    scribe_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    scribe_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Audit ---
    let history = ContentHistory::new(PgLedger::new(pool.clone()), config);
    let broken = match history.verify_all_chains().await {
        Ok(broken) => broken,
        Err(e) => {
            tracing::error!(error = %e, "Chain audit failed");
            pool.close().await;
            return ExitCode::FAILURE;
        }
    };

    pool.close().await;

    if broken.is_empty() {
        tracing::info!("All version chains are healthy");
        return ExitCode::SUCCESS;
    }

    for (entity, report) in &broken {
        let issues = serde_json::to_string(&report.issues).unwrap_or_default();
        tracing::error!(
            entity = %entity,
            versions = report.version_count,
            %issues,
            "Broken version chain",
        );
    }
    tracing::error!(broken = broken.len(), "Chain audit found integrity issues");
    ExitCode::FAILURE
}
