//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sd-cli migrate
//! ```
//!
//! Migrations live in `crates/admin/migrations/` and are embedded at build
//! time.

use thiserror::Error;
use tracing::info;

use storedesk_admin::config::AdminConfig;
use storedesk_admin::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run(config: &AdminConfig) -> Result<(), MigrationError> {
    info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;

    info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
