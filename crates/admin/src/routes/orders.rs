//! Order workflow handlers for admins and representatives.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};

use zeytin_core::OrderId;

use crate::db::orders::OrderSummary;
use crate::error::Result;
use crate::extract::{Json, Query};
use crate::middleware::RequireAuth;
use crate::models::{OrderActivity, OrderWithAssignee};
use crate::services::OrderService;
use crate::services::orders::{OrderListQuery, UpdateOrderInput};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list))
        .route("/api/orders/summary", get(summary))
        .route("/api/orders/{id}", get(show).patch(update))
        .route("/api/orders/{id}/activities", get(activities))
}

/// Orders visible to the actor.
///
/// # Errors
///
/// Returns 403 when a representative asks for someone else's orders.
pub async fn list(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderWithAssignee>>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.list(&actor, query).await?))
}

/// Order count, revenue and per-status counts.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn summary(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderSummary>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.summary(&actor, query.mine()).await?))
}

/// # Errors
///
/// Returns 404 for an unknown id and 403 when the order belongs to another
/// representative.
pub async fn show(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithAssignee>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.get(&actor, id).await?))
}

/// # Errors
///
/// Same as [`show`].
pub async fn activities(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<OrderActivity>>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.activities(&actor, id).await?))
}

/// Apply status, payment, fulfillment and assignment changes.
///
/// # Errors
///
/// Returns 403 for changes the actor may not make, 404 for an unknown order
/// or representative and 409 when stock cannot be deducted again.
pub async fn update(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateOrderInput>,
) -> Result<Json<OrderWithAssignee>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.update(&actor, id, body).await?))
}
