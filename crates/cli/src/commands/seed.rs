//! Seed default accounts, store settings and the sample catalog.
//!
//! Credentials come from `ADMIN_USERNAME`, `ADMIN_PASSWORD`, `REP_USERNAME`,
//! `REP_PASSWORD` and `REP_FULL_NAME`. Running it twice changes nothing.

use tracing::info;

use zeytin_admin::config::{SeedCredentials, admin_database_url};
use zeytin_admin::db;
use zeytin_admin::services::seed_all;

/// Run every seeding step against the admin database.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a step fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::create_pool(&admin_database_url()?).await?;
    info!("Connected to database");

    db::run_migrations(&pool).await?;

    let credentials = SeedCredentials::from_env();
    let report = seed_all(&pool, &credentials).await?;

    info!("Seeding complete!");
    info!("  Admin created: {}", report.admin_created);
    info!("  Representative created: {}", report.representative_created);
    info!("  Settings inserted: {}", report.settings_inserted);
    info!("  Categories inserted: {}", report.categories_inserted);
    info!(
        "  Products inserted: {} (skipped {} existing)",
        report.products_inserted, report.products_skipped
    );

    Ok(())
}
