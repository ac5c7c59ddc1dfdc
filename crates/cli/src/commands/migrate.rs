//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! zt-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` or `DATABASE_URL` - `PostgreSQL` connection string
//! - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSL` -
//!   used when neither URL is set
//!
//! Migration files live in `crates/admin/migrations/` and are embedded in
//! the admin crate.

use thiserror::Error;

use zeytin_admin::config::{ConfigError, admin_database_url};
use zeytin_admin::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = admin_database_url()?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!(
        migrations = db::MIGRATOR.iter().count(),
        "Running admin migrations..."
    );
    db::run_migrations(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
