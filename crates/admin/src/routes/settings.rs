//! Store settings handlers.

use std::collections::BTreeMap;

use axum::{Router, extract::State, routing::get};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::services::SettingsService;
use crate::services::settings::UpdateSettingsInput;
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(all).put(update))
        .route("/api/settings/public", get(public))
}

fn service(state: &AppState) -> SettingsService<'_> {
    SettingsService::new(state.pool(), state.cache(), state.events())
}

/// Every setting.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn all(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>> {
    Ok(Json(service(&state).all().await?))
}

/// The storefront-visible settings.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn public(State(state): State<AppState>) -> Result<Json<BTreeMap<String, String>>> {
    let public = service(&state).public().await?;
    Ok(Json(public.as_ref().clone()))
}

/// Upsert the provided settings.
///
/// # Errors
///
/// Returns 400 on validation errors.
pub async fn update(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<UpdateSettingsInput>,
) -> Result<Json<BTreeMap<String, String>>> {
    let updated = service(&state).update(body).await?;
    tracing::info!(user_id = %actor.id, "Settings updated");
    Ok(Json(updated))
}
