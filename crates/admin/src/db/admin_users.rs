//! Admin user repository for database operations.
//!
//! Covers both full admins and customer representatives; the `role` column
//! tells them apart.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use zeytin_core::AdminUserId;

use super::RepositoryError;
use crate::models::admin_user::{AdminRole, AdminUser};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: Uuid,
    username: String,
    full_name: String,
    password_hash: String,
    role: AdminRole,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AdminUserRow> for AdminUser {
    fn from(row: AdminUserRow) -> Self {
        Self {
            id: AdminUserId::new(row.id),
            username: row.username,
            full_name: row.full_name,
            password_hash: row.password_hash,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new user.
#[derive(Debug, Clone)]
pub struct NewAdminUser<'a> {
    pub username: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub role: AdminRole,
    pub is_active: bool,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AdminUserChanges {
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, username, full_name, password_hash, role, is_active,
                   created_at, updated_at
            FROM admin_users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a user by username (exact match; usernames are stored lowercased).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, username, full_name, password_hash, role, is_active,
                   created_at, updated_at
            FROM admin_users
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List users with `role`, active ones first, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_role(&self, role: AdminRole) -> Result<Vec<AdminUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, username, full_name, password_hash, role, is_active,
                   created_at, updated_at
            FROM admin_users
            WHERE role = $1
            ORDER BY is_active DESC, created_at DESC
            ",
        )
        .bind(role)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get an active representative by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_representative(
        &self,
        id: AdminUserId,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, username, full_name, password_hash, role, is_active,
                   created_at, updated_at
            FROM admin_users
            WHERE id = $1 AND role = 'REPRESENTATIVE' AND is_active = TRUE
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user: &NewAdminUser<'_>) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO admin_users (username, full_name, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, full_name, password_hash, role, is_active,
                      created_at, updated_at
            ",
        )
        .bind(user.username)
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "username already exists"))?;

        Ok(row.into())
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: AdminUserId,
        changes: &AdminUserChanges,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            UPDATE admin_users
            SET full_name = COALESCE($2, full_name),
                password_hash = COALESCE($3, password_hash),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, full_name, password_hash, role, is_active,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.full_name.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Force a user to be an active admin, filling in the display name when
    /// it is empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn promote_to_admin(
        &self,
        id: AdminUserId,
        fallback_full_name: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            UPDATE admin_users
            SET role = 'ADMIN',
                is_active = TRUE,
                full_name = CASE WHEN full_name = '' THEN $2 ELSE full_name END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, full_name, password_hash, role, is_active,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(fallback_full_name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
