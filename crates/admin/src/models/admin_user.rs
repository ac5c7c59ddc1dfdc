//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use zeytin_core::AdminUserId;

// Re-export AdminRole from core for convenience
pub use zeytin_core::AdminRole;

/// An admin or representative account.
///
/// The password hash never leaves the server: it is skipped on serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: AdminUserId,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public part of a user, embedded in login responses and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: AdminUserId,
    pub username: String,
    pub full_name: String,
    pub role: AdminRole,
    pub is_active: bool,
}

impl From<&AdminUser> for UserSummary {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = AdminUser {
            id: AdminUserId::generate(),
            username: "temsilci".to_owned(),
            full_name: "Musteri Temsilcisi".to_owned(),
            password_hash: "$argon2id$v=19$secret".to_owned(),
            role: AdminRole::Representative,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["fullName"], "Musteri Temsilcisi");
        assert_eq!(json["role"], "REPRESENTATIVE");

        let summary = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert_eq!(summary["isActive"], true);
        assert!(summary.get("createdAt").is_none());
    }
}
