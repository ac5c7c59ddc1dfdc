//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use zeytin_core::AdminUserId;

use super::admin_user::{AdminRole, AdminUser};

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in user. Order
/// access checks and activity records are driven by this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// User's database ID.
    pub id: AdminUserId,
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Permission level.
    pub role: AdminRole,
}

impl CurrentAdmin {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
