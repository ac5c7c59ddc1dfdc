//! Settings database operations.
//!
//! Settings are plain key/value text pairs. Structured values (the storefront
//! `websiteConfig`) are stored as JSON text and passed through untouched.

use std::collections::BTreeMap;

use sqlx::{PgExecutor, PgPool};

use super::RepositoryError;

/// Get every setting, sorted by key.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_all(pool: &PgPool) -> Result<BTreeMap<String, String>, RepositoryError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r"
        SELECT key, value FROM settings
        ORDER BY key ASC
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Insert or overwrite a setting.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn upsert<'e>(
    executor: impl PgExecutor<'e>,
    key: &str,
    value: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert a setting only if the key does not exist yet.
///
/// Returns `true` when a row was inserted.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn insert_if_missing(
    pool: &PgPool,
    key: &str,
    value: &str,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO NOTHING
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
