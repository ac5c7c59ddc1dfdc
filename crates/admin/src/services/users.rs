//! Representative account management.

use serde::Deserialize;
use sqlx::PgPool;

use zeytin_core::validation::Violations;
use zeytin_core::{AdminRole, AdminUserId};

use super::auth::{hash_password, normalize_username};
use crate::db::RepositoryError;
use crate::db::admin_users::{AdminUserChanges, AdminUserRepository, NewAdminUser};
use crate::error::{AppError, Result};
use crate::models::AdminUser;

const MIN_USERNAME_LENGTH: usize = 3;
/// Minimum password length for admin-created accounts.
pub const MIN_PASSWORD_LENGTH: usize = 6;
const MIN_FULL_NAME_LENGTH: usize = 2;

/// `POST /api/users/representatives` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepresentativeInput {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub is_active: Option<bool>,
}

impl CreateRepresentativeInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("username", &self.username, MIN_USERNAME_LENGTH);
        v.check(self.password.chars().count() >= MIN_PASSWORD_LENGTH, || {
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters")
        });
        v.min_chars("fullName", &self.full_name, MIN_FULL_NAME_LENGTH);
        v
    }
}

/// `PATCH /api/users/representatives/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepresentativeInput {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateRepresentativeInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars_opt("fullName", self.full_name.as_deref(), MIN_FULL_NAME_LENGTH);
        if let Some(password) = &self.password {
            v.check(password.chars().count() >= MIN_PASSWORD_LENGTH, || {
                format!("password must be at least {MIN_PASSWORD_LENGTH} characters")
            });
        }
        v
    }
}

/// Representative management service.
pub struct UserService<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// All representatives, active first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_representatives(&self) -> Result<Vec<AdminUser>> {
        Ok(self.users.list_by_role(AdminRole::Representative).await?)
    }

    /// Create a representative account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::Conflict` if the username is taken.
    pub async fn create_representative(
        &self,
        input: CreateRepresentativeInput,
    ) -> Result<AdminUser> {
        input.validate().into_result()?;

        let username = normalize_username(&input.username);
        if self.users.get_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("username already exists".to_owned()));
        }

        let password_hash = hash_password(input.password).await?;
        let user = self
            .users
            .create(&NewAdminUser {
                username: &username,
                full_name: input.full_name.trim(),
                password_hash: &password_hash,
                role: AdminRole::Representative,
                is_active: input.is_active.unwrap_or(true),
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Representative created");
        Ok(user)
    }

    /// Apply a partial update to a representative.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::NotFound` if `id` is not a representative.
    pub async fn update_representative(
        &self,
        id: AdminUserId,
        input: UpdateRepresentativeInput,
    ) -> Result<AdminUser> {
        input.validate().into_result()?;

        let existing = self
            .users
            .get_by_id(id)
            .await?
            .filter(|user| user.role == AdminRole::Representative)
            .ok_or_else(|| AppError::NotFound("representative not found".to_owned()))?;

        let password_hash = match input.password.filter(|p| !p.is_empty()) {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };
        let changes = AdminUserChanges {
            full_name: input.full_name.map(|name| name.trim().to_owned()),
            password_hash,
            is_active: input.is_active,
        };

        let user = self.users.update(existing.id, &changes).await.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("representative not found".to_owned()),
            other => AppError::Database(other),
        })?;
        Ok(user)
    }
}
