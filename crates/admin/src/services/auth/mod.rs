//! Admin authentication service.
//!
//! Username/password login for admins and representatives. Passwords are
//! stored as argon2id PHC strings; hashing and verification run on the
//! blocking thread pool so they never stall the async workers.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use crate::db::admin_users::AdminUserRepository;
use crate::models::AdminUser;

/// Admin authentication service.
pub struct AuthService<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// Check a username/password pair.
    ///
    /// The username is matched case-insensitively (usernames are stored
    /// lowercased).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown or the
    /// password is wrong.
    /// Returns `AuthError::AccountInactive` if the account is deactivated.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminUser, AuthError> {
        let username = normalize_username(username);
        let user = self
            .users
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password.to_owned(), user.password_hash.clone()).await?;

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(user)
    }
}

/// Trim and lowercase a username.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Hash a password with argon2id on the blocking pool.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password_sync(&password)).await?
}

/// Verify a password against a stored hash on the blocking pool.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match or
/// the stored hash is unreadable.
pub async fn verify_password(password: String, hash: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || verify_password_sync(&password, &hash)).await?
}

/// Hash a password.
fn hash_password_sync(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password_sync(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password_sync("admin123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password_sync("temsilci123").unwrap();
        assert!(verify_password_sync("temsilci123", &hash).is_ok());
        assert!(matches!(
            verify_password_sync("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password_sync("temsilci123", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_async_roundtrip_runs_on_blocking_pool() {
        let hash = hash_password("s3cret-pass".to_owned()).await.unwrap();
        verify_password("s3cret-pass".to_owned(), hash).await.unwrap();
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Temsilci "), "temsilci");
    }
}
