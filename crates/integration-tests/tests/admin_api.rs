//! HTTP integration tests for the admin API.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The admin server running and seeded (`cargo run -p zeytin-admin` with
//!   `SEED_ON_STARTUP=true`, or `zt-cli seed` beforehand)
//! - `ADMIN_USERNAME`/`ADMIN_PASSWORD` and `REP_USERNAME`/`REP_PASSWORD`
//!   matching the seeded accounts when the defaults were overridden
//!
//! Run with: cargo test -p zeytin-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Base URL for admin API (configurable via environment).
fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Log in and return a client carrying the session cookie.
async fn logged_in_client(username: &str, password: &str) -> Client {
    let client = client();
    let resp = client
        .post(format!("{}/api/auth/login", admin_base_url()))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK, "login as {username} failed");
    client
}

async fn admin_client() -> Client {
    logged_in_client(
        &env_or("ADMIN_USERNAME", "admin"),
        &env_or("ADMIN_PASSWORD", "admin123"),
    )
    .await
}

async fn representative_client() -> Client {
    logged_in_client(
        &env_or("REP_USERNAME", "temsilci"),
        &env_or("REP_PASSWORD", "temsilci123"),
    )
    .await
}

/// First active product from the public catalog.
async fn first_public_product(client: &Client) -> Value {
    let products: Value = client
        .get(format!("{}/api/catalog/public/products", admin_base_url()))
        .send()
        .await
        .expect("Failed to get public products")
        .json()
        .await
        .expect("Invalid JSON");
    products
        .as_array()
        .and_then(|list| list.first())
        .cloned()
        .expect("Seeded catalog should have products")
}

// ============================================================================
// Health & Auth
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_health() {
    let resp = client()
        .get(format!("{}/api/health", admin_base_url()))
        .send()
        .await
        .expect("Failed to get health");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "zeytin-admin-api");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_protected_routes_require_session() {
    let client = client();
    let base_url = admin_base_url();

    for path in ["/api/auth/me", "/api/orders", "/api/settings"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");

        let body: Value = resp.json().await.expect("Invalid JSON");
        assert_eq!(body["statusCode"], 401);
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_me_logout() {
    let client = admin_client().await;
    let base_url = admin_base_url();

    let me: Value = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Failed to get me")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(me["user"]["role"], "ADMIN");
    assert!(me["user"].get("passwordHash").is_none());

    let resp = client
        .post(format!("{base_url}/api/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_wrong_password_is_rejected() {
    let resp = client()
        .post(format!("{}/api/auth/login", admin_base_url()))
        .json(&json!({ "username": "admin", "password": "definitely-wrong" }))
        .send()
        .await
        .expect("Request failed");

    assert!(
        resp.status() == StatusCode::UNAUTHORIZED
            || resp.status() == StatusCode::TOO_MANY_REQUESTS
    );
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_public_settings_hide_private_keys() {
    let body: Value = client()
        .get(format!("{}/api/settings/public", admin_base_url()))
        .send()
        .await
        .expect("Failed to get public settings")
        .json()
        .await
        .expect("Invalid JSON");

    let keys: Vec<&str> = body
        .as_object()
        .expect("settings should be an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert!(keys.contains(&"storeName"));
    assert!(keys.iter().all(|key| [
        "storeName",
        "supportEmail",
        "currency",
        "timezone",
        "taxRate",
        "websiteConfig"
    ]
    .contains(key)));
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_settings_update_validates_input() {
    let resp = admin_client()
        .await
        .put(format!("{}/api/settings", admin_base_url()))
        .json(&json!({ "supportEmail": "not-an-email", "taxRate": 150 }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid JSON");
    let messages = body["message"].as_array().expect("message list");
    assert_eq!(messages.len(), 2);
}

// ============================================================================
// Checkout & Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_checkout_deducts_stock_and_cancel_restores_it() {
    let admin = admin_client().await;
    let base_url = admin_base_url();
    let product = first_public_product(&admin).await;
    let product_id = product["id"].as_str().expect("product id").to_owned();
    let stock_before = product["stock"].as_i64().expect("product stock");

    let resp = client()
        .post(format!("{base_url}/api/shop/orders"))
        .json(&json!({
            "customerName": "Test Musteri",
            "customerEmail": "test@example.com",
            "shippingAddress": {
                "fullName": "Test Musteri",
                "country": "Turkiye",
                "city": "Izmir",
                "line1": "Test Sokak 1"
            },
            "items": [{
                "productId": product_id,
                "productName": product["name"],
                "quantity": 1,
                "unitPrice": product["price"]
            }]
        }))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("Invalid JSON");
    let order_number = order["orderNumber"].as_str().expect("order number");
    assert!(order_number.starts_with("ZYT-"));
    assert_eq!(order["status"], "NEW");

    let after_checkout = first_public_product(&admin).await;
    if after_checkout["id"] == product["id"] {
        assert_eq!(after_checkout["stock"].as_i64(), Some(stock_before - 1));
    }

    let lookup = client()
        .get(format!("{base_url}/api/shop/orders/{order_number}"))
        .send()
        .await
        .expect("Failed to look up order");
    assert_eq!(lookup.status(), StatusCode::OK);

    let resp = admin
        .patch(format!("{base_url}/api/orders/{}", order["id"].as_str().expect("order id")))
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cancelled["stockDeducted"], false);

    let after_cancel = first_public_product(&admin).await;
    if after_cancel["id"] == product["id"] {
        assert_eq!(after_cancel["stock"].as_i64(), Some(stock_before));
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_unknown_order_number_is_not_found() {
    let resp = client()
        .get(format!("{}/api/shop/orders/ZYT-19000101-9999", admin_base_url()))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_representative_cannot_view_other_representatives_orders() {
    let resp = representative_client()
        .await
        .get(format!(
            "{}/api/orders?assignedRepresentativeId=00000000-0000-4000-8000-000000000000",
            admin_base_url()
        ))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
