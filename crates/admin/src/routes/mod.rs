//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                              - Liveness
//! GET   /health/ready                        - Readiness (database)
//! GET   /api/health                          - JSON status
//!
//! # Auth
//! POST  /api/auth/login                      - Start a session (rate limited)
//! POST  /api/auth/logout                     - End the session
//! GET   /api/auth/me                         - Current user
//!
//! # Representatives
//! GET   /api/users/representatives           - List
//! POST  /api/users/representatives           - Create (admin)
//! PATCH /api/users/representatives/{id}      - Update (admin)
//!
//! # Settings
//! GET   /api/settings                        - All settings
//! PUT   /api/settings                        - Upsert
//! GET   /api/settings/public                 - Storefront subset
//!
//! # Catalog
//! GET   /api/catalog/public/categories       - Active categories
//! GET   /api/catalog/public/products         - Active products
//! GET   /api/catalog/categories              - Categories with products
//! POST  /api/catalog/categories              - Create category
//! PATCH /api/catalog/categories/{id}         - Update category
//! GET   /api/catalog/products                - Products with category
//! POST  /api/catalog/products                - Create product
//! PATCH /api/catalog/products/{id}           - Update product
//!
//! # Orders
//! GET   /api/orders                          - List (scoped to the actor)
//! GET   /api/orders/summary                  - Dashboard totals
//! GET   /api/orders/{id}                     - Detail
//! PATCH /api/orders/{id}                     - Workflow update
//! GET   /api/orders/{id}/activities          - Audit trail
//!
//! # Shop (public)
//! POST  /api/shop/orders                     - Place order (rate limited)
//! GET   /api/shop/orders/{orderNumber}       - Look up order
//!
//! # Realtime
//! GET   /admin-live                          - WebSocket event feed
//! ```

pub mod auth;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod realtime;
pub mod settings;
pub mod shop;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the admin API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(settings::router())
        .merge(catalog::router())
        .merge(orders::router())
        .merge(shop::router())
        .merge(realtime::router())
}
