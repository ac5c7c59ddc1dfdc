//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin
//! zt-cli admin create -u mehmet -n "Mehmet Kaya" -p s3cretpass
//!
//! # Create a representative
//! zt-cli admin create -u ayse -n "Ayse Yilmaz" -p s3cretpass -r representative
//! ```

use thiserror::Error;

use zeytin_admin::config::{ConfigError, admin_database_url};
use zeytin_admin::db::admin_users::NewAdminUser;
use zeytin_admin::db::{self, AdminUserRepository, RepositoryError};
use zeytin_admin::services::auth::{AuthError, hash_password, normalize_username};
use zeytin_admin::services::users::MIN_PASSWORD_LENGTH;
use zeytin_core::{AdminRole, AdminUserId};

const MIN_USERNAME_LENGTH: usize = 3;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password hashing failed: {0}")]
    Auth(#[from] AuthError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, representative")]
    InvalidRole(String),

    #[error("Username must be at least {MIN_USERNAME_LENGTH} characters")]
    InvalidUsername,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// User already exists.
    #[error("User already exists: {0}")]
    UserExists(String),
}

/// Parse a role name case-insensitively.
///
/// # Errors
///
/// Returns `AdminError::InvalidRole` for anything but admin/representative.
pub fn parse_role(role: &str) -> Result<AdminRole, AdminError> {
    role.trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))
}

/// Create a new user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error on invalid input, an existing username, or a database
/// failure.
pub async fn create_user(
    username: &str,
    name: &str,
    password: String,
    role: &str,
) -> Result<AdminUserId, AdminError> {
    let role = parse_role(role)?;
    let username = normalize_username(username);
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(AdminError::InvalidUsername);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&admin_database_url()?).await?;
    let users = AdminUserRepository::new(&pool);

    if users.get_by_username(&username).await?.is_some() {
        return Err(AdminError::UserExists(username));
    }

    tracing::info!("Creating user: {} ({})", username, role);
    let password_hash = hash_password(password).await?;
    let user = users
        .create(&NewAdminUser {
            username: &username,
            full_name: name.trim(),
            password_hash: &password_hash,
            role,
            is_active: true,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin").unwrap(), AdminRole::Admin);
        assert_eq!(
            parse_role(" Representative ").unwrap(),
            AdminRole::Representative
        );
        assert!(matches!(
            parse_role("viewer"),
            Err(AdminError::InvalidRole(role)) if role == "viewer"
        ));
    }
}
