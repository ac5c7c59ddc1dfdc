//! Integration tests for the order workflow rules.
//!
//! These exercise the checkout and status-transition logic shared by the
//! admin crate and the core crate without touching a database.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use zeytin_admin::db::orders::OrderScope;
use zeytin_admin::error::AppError;
use zeytin_admin::models::{ActivityKind, CurrentAdmin};
use zeytin_admin::services::orders::{
    CreateShopOrderInput, UpdateOrderInput, apply_workflow_changes, ensure_can_access,
    resolve_scope,
};
use zeytin_core::catalog::ProductVariant;
use zeytin_core::inventory::{ProductStock, StockAction, resolve_stock_action};
use zeytin_core::orders::format_order_number;
use zeytin_core::{AdminRole, AdminUserId, OrderStatus, PaymentStatus};

fn checkout_body() -> serde_json::Value {
    json!({
        "customerName": "Ayse Yilmaz",
        "customerEmail": "ayse@example.com",
        "customerPhone": "+90 555 000 00 00",
        "shippingAddress": {
            "fullName": "Ayse Yilmaz",
            "country": "Turkiye",
            "city": "Izmir",
            "line1": "Kordon Cd. No:1"
        },
        "items": [
            { "productName": "Sizma Zeytinyagi 5 Lt", "sku": "ERZ-ZYT-5LT-001", "quantity": 2, "unitPrice": 1299.9 },
            { "productName": "Gemlik Siyah Zeytin 1 Kg", "quantity": 1, "unitPrice": "349.50" }
        ],
        "shippingFee": 49.9,
        "discountAmount": 100,
        "currency": "try",
        "paymentStatus": "PAID"
    })
}

fn variant(title: &str, sku: &str, stock: i32) -> ProductVariant {
    ProductVariant {
        title: title.to_owned(),
        sku: sku.to_owned(),
        price: Decimal::new(18_990, 2),
        stock,
        option_one: Some(title.to_owned()),
        option_two: None,
        option_three: None,
        is_default: false,
    }
}

fn representative(id: AdminUserId) -> CurrentAdmin {
    CurrentAdmin {
        id,
        username: "temsilci".to_owned(),
        full_name: "Musteri Temsilcisi".to_owned(),
        role: AdminRole::Representative,
    }
}

// =============================================================================
// Checkout
// =============================================================================

#[test]
fn test_checkout_builds_order_with_totals() {
    let input: CreateShopOrderInput =
        serde_json::from_value(checkout_body()).expect("checkout body should parse");
    assert!(input.validate().is_empty());

    let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
    let items = input.items.iter().cloned().map(|item| item.into_item().unwrap()).collect();
    let number = format_order_number(now.date_naive(), 7);
    let order = input.into_order(number, items, now).unwrap();

    assert_eq!(order.order_number, "ZYT-20260314-0007");
    assert_eq!(order.subtotal, Decimal::new(294_930, 2));
    assert_eq!(order.grand_total, Decimal::new(289_920, 2));
    assert_eq!(order.currency, "TRY");
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.paid_at, Some(now));
    assert!(order.stock_deducted);
    assert!(order.assigned_representative_id.is_none());
}

#[test]
fn test_checkout_reports_every_invalid_field() {
    let mut body = checkout_body();
    body["customerEmail"] = json!("not-an-email");
    body["items"] = json!([]);
    body["shippingAddress"]["city"] = json!("");

    let input: CreateShopOrderInput = serde_json::from_value(body).unwrap();
    let messages = input.validate().messages;

    assert!(messages.contains(&"customerEmail must be an email".to_owned()));
    assert!(messages.contains(&"items must not be empty".to_owned()));
    assert!(messages.iter().any(|m| m.starts_with("shippingAddress.city")));
}

// =============================================================================
// Status transitions and stock
// =============================================================================

#[test]
fn test_cancel_then_reopen_moves_stock_both_ways() {
    assert_eq!(
        resolve_stock_action(OrderStatus::Confirmed, OrderStatus::Cancelled, true),
        Some(StockAction::Restore)
    );
    assert_eq!(
        resolve_stock_action(OrderStatus::Cancelled, OrderStatus::Preparing, false),
        Some(StockAction::Deduct)
    );
    assert_eq!(
        resolve_stock_action(OrderStatus::Cancelled, OrderStatus::Refunded, false),
        None
    );
    assert_eq!(
        resolve_stock_action(OrderStatus::New, OrderStatus::Shipped, true),
        None
    );
}

#[test]
fn test_variant_stock_is_deducted_and_summed() {
    let mut stock = ProductStock {
        name: "Yesil Zeytin".to_owned(),
        stock: 12,
        has_variants: true,
        variants: vec![
            variant("500 g", "YSZ-500", 5),
            variant("1 Kg", "YSZ-1000", 7),
        ],
    };

    stock
        .apply_delta(Some("YSZ-500"), StockAction::Deduct.signed_delta(3))
        .unwrap();
    assert_eq!(stock.stock, 9);

    let err = stock
        .apply_delta(Some("YSZ-500"), StockAction::Deduct.signed_delta(3))
        .unwrap_err();
    assert_eq!(err.sku.as_deref(), Some("YSZ-500"));
    assert_eq!(stock.stock, 9);
}

#[test]
fn test_workflow_change_stamps_and_logs() {
    let input: CreateShopOrderInput = serde_json::from_value(checkout_body()).unwrap();
    let placed = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
    let items = input.items.iter().cloned().map(|item| item.into_item().unwrap()).collect();
    let mut order = input
        .into_order(format_order_number(placed.date_naive(), 1), items, placed)
        .unwrap();

    let later = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
    let update = UpdateOrderInput {
        status: Some(OrderStatus::Shipped),
        payment_status: Some(PaymentStatus::Paid),
        ..Default::default()
    };
    let activities = apply_workflow_changes(&mut order, &update, later);

    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.shipped_at, Some(later));
    assert_eq!(order.paid_at, Some(placed));
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].kind, ActivityKind::OrderStatusUpdated);
}

// =============================================================================
// Representative access
// =============================================================================

#[test]
fn test_representative_scope() {
    let me = AdminUserId::generate();
    let actor = representative(me);

    assert_eq!(
        resolve_scope(&actor, None, false).unwrap(),
        OrderScope::AssignedToOrUnassigned(me)
    );
    assert_eq!(
        resolve_scope(&actor, Some(me), true).unwrap(),
        OrderScope::AssignedTo(me)
    );
    assert!(matches!(
        resolve_scope(&actor, Some(AdminUserId::generate()), false),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn test_representative_cannot_open_foreign_order() {
    let input: CreateShopOrderInput = serde_json::from_value(checkout_body()).unwrap();
    let now = Utc::now();
    let items = input.items.iter().cloned().map(|item| item.into_item().unwrap()).collect();
    let mut order = input
        .into_order(format_order_number(now.date_naive(), 1), items, now)
        .unwrap();

    let me = AdminUserId::generate();
    let actor = representative(me);
    assert!(ensure_can_access(&actor, &order).is_ok());

    order.assigned_representative_id = Some(AdminUserId::generate());
    assert!(matches!(
        ensure_can_access(&actor, &order),
        Err(AppError::Forbidden(_))
    ));

    order.assigned_representative_id = Some(me);
    assert!(ensure_can_access(&actor, &order).is_ok());
}
