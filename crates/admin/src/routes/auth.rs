//! Session login for admins and representatives.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{RequireAuth, clear_current_admin, login_rate_limiter, set_current_admin};
use crate::models::{CurrentAdmin, UserSummary};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Build the auth router. Login is rate limited per client IP.
pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/auth/login", post(login))
        .route_layer(login_rate_limiter());

    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .merge(limited)
}

/// `POST /api/auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Check credentials and start a session.
///
/// # Errors
///
/// Returns 401 for unknown users, wrong passwords and inactive accounts.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let user = AuthService::new(state.pool())
        .login(&body.username, &body.password)
        .await?;

    set_current_admin(&session, &CurrentAdmin::from(&user))
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id, &user.username);

    tracing::info!(user_id = %user.id, role = %user.role, "Admin logged in");
    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

/// End the session.
///
/// # Errors
///
/// Returns 500 if the session store cannot be reached.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, re-read from the database.
///
/// # Errors
///
/// Returns 404 if the account was deleted and 401 if it was deactivated.
pub async fn me(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<UserSummary>> {
    let user = AdminUserRepository::new(state.pool())
        .get_by_id(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;

    if !user.is_active {
        return Err(AuthError::AccountInactive.into());
    }

    Ok(Json(UserSummary::from(&user)))
}
