//! Catalog handlers: public storefront reads and authenticated management.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};

use zeytin_core::{CategoryId, ProductId};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::{Category, CategoryWithProducts, ProductWithCategory};
use crate::services::CatalogService;
use crate::services::catalog::{
    CreateCategoryInput, CreateProductInput, UpdateCategoryInput, UpdateProductInput,
};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/catalog/public/categories", get(public_categories))
        .route("/api/catalog/public/products", get(public_products))
        .route(
            "/api/catalog/categories",
            get(list_categories).post(create_category),
        )
        .route("/api/catalog/categories/{id}", patch(update_category))
        .route(
            "/api/catalog/products",
            get(list_products).post(create_product),
        )
        .route("/api/catalog/products/{id}", patch(update_product))
}

fn service(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.cache(), state.events())
}

/// Active categories for the storefront.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn public_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = service(&state).public_categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

/// Active products for the storefront, each with its category.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn public_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductWithCategory>>> {
    let products = service(&state).public_products().await?;
    Ok(Json(products.as_ref().clone()))
}

/// Every category with its products.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_categories(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithProducts>>> {
    Ok(Json(service(&state).categories_with_products().await?))
}

/// # Errors
///
/// Returns 400 on validation errors.
pub async fn create_category(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = service(&state).create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// # Errors
///
/// Returns 400 on validation errors and 404 for an unknown id.
pub async fn update_category(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>> {
    Ok(Json(service(&state).update_category(id, body).await?))
}

/// Every product with its category.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_products(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductWithCategory>>> {
    Ok(Json(service(&state).products_with_category().await?))
}

/// # Errors
///
/// Returns 400 on validation errors, 404 for an unknown category and 409
/// for a duplicate sku or barcode.
pub async fn create_product(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ProductWithCategory>)> {
    let product = service(&state).create_product(body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// # Errors
///
/// Returns 400 on validation errors, 404 for an unknown product or category
/// and 409 for a duplicate sku or barcode.
pub async fn update_product(
    RequireAuth(_actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductInput>,
) -> Result<Json<ProductWithCategory>> {
    Ok(Json(service(&state).update_product(id, body).await?))
}
