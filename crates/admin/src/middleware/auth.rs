//! Authentication extractors for admin.
//!
//! The logged-in user lives in the session as a [`CurrentAdmin`]. Handlers
//! take [`RequireAuth`] for any signed-in user or [`RequireAdmin`] for
//! admin-only operations.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentAdmin, session_keys};

/// Extractor that requires a signed-in admin or representative.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(actor): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", actor.full_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentAdmin);

/// Extractor that requires a signed-in user with the ADMIN role.
pub struct RequireAdmin(pub CurrentAdmin);

/// Rejection for the auth extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session or no user in it.
    Unauthorized,
    /// Signed in, but a representative.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => {
                AppError::Unauthorized("authentication required".to_owned()).into_response()
            }
            Self::Forbidden => {
                AppError::Forbidden("admin role required".to_owned()).into_response()
            }
        }
    }
}

/// Read the current admin from the request's session.
pub async fn current_admin(parts: &Parts) -> Option<CurrentAdmin> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_admin(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = current_admin(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;

        if !admin.is_admin() {
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(admin))
    }
}

/// Store the current admin in the session after rotating its id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be reached.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (mut parts, ()) = Request::builder()
            .uri("/api/orders")
            .body(())
            .unwrap()
            .into_parts();

        let rejection = RequireAuth::from_request_parts(&mut parts, &()).await.err();
        assert_eq!(rejection, Some(AuthRejection::Unauthorized));

        let rejection = RequireAdmin::from_request_parts(&mut parts, &()).await.err();
        assert_eq!(rejection, Some(AuthRejection::Unauthorized));
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
