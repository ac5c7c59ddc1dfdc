//! Public storefront order endpoints.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::order_rate_limiter;
use crate::models::{Order, OrderWithAssignee};
use crate::services::OrderService;
use crate::services::orders::CreateShopOrderInput;
use crate::state::AppState;

/// Build the shop router. Order creation is rate limited per client IP.
pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/shop/orders", post(create_order))
        .route_layer(order_rate_limiter());

    Router::new()
        .route("/api/shop/orders/{order_number}", get(get_order))
        .merge(limited)
}

/// Place a website order.
///
/// # Errors
///
/// Returns 400 on validation errors, 404 for an unknown product id and 409
/// when stock is insufficient.
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateShopOrderInput>,
) -> Result<(StatusCode, Json<OrderWithAssignee>)> {
    let service = OrderService::new(state.pool(), state.events());
    let order = service.create_from_website(body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Look up an order by its public number.
///
/// # Errors
///
/// Returns 404 if the number is unknown.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>> {
    let service = OrderService::new(state.pool(), state.events());
    Ok(Json(service.get_by_number(&order_number).await?))
}
