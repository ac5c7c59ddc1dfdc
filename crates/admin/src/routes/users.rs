//! Representative management handlers.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};

use zeytin_core::AdminUserId;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::AdminUser;
use crate::services::UserService;
use crate::services::users::{CreateRepresentativeInput, UpdateRepresentativeInput};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users/representatives",
            get(list_representatives).post(create_representative),
        )
        .route(
            "/api/users/representatives/{id}",
            patch(update_representative),
        )
}

/// List representatives, active first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_representatives(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUser>>> {
    Ok(Json(
        UserService::new(state.pool()).list_representatives().await?,
    ))
}

/// Create a representative (admin only).
///
/// # Errors
///
/// Returns 400 on validation errors and 409 if the username is taken.
pub async fn create_representative(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateRepresentativeInput>,
) -> Result<(StatusCode, Json<AdminUser>)> {
    let user = UserService::new(state.pool())
        .create_representative(body)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a representative (admin only).
///
/// # Errors
///
/// Returns 400 on validation errors and 404 if `id` is not a representative.
pub async fn update_representative(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
    Json(body): Json<UpdateRepresentativeInput>,
) -> Result<Json<AdminUser>> {
    Ok(Json(
        UserService::new(state.pool())
            .update_representative(id, body)
            .await?,
    ))
}
