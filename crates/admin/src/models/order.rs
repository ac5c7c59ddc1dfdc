//! Order and order activity models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use zeytin_core::orders::{OrderAddress, OrderItem};
use zeytin_core::{
    AdminUserId, FulfillmentStatus, OrderActivityId, OrderId, OrderStatus, PaymentMethod,
    PaymentStatus,
};

use super::admin_user::UserSummary;

/// Order source recorded for storefront checkouts.
pub const SOURCE_WEBSITE: &str = "WEBSITE";

/// An order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: OrderAddress,
    pub billing_address: Option<OrderAddress>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_provider: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub fulfillment_status: FulfillmentStatus,
    pub customer_note: Option<String>,
    pub admin_note: Option<String>,
    pub source: String,
    pub assigned_representative_id: Option<AdminUserId>,
    pub assignment_note: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub shipping_method: Option<String>,
    pub shipping_company: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub stock_deducted: bool,
    pub placed_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// An order with its assigned representative embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithAssignee {
    #[serde(flatten)]
    pub order: Order,
    pub assigned_representative: Option<UserSummary>,
}

/// One entry of an order's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderActivity {
    pub id: OrderActivityId,
    pub order_id: OrderId,
    pub actor_id: Option<AdminUserId>,
    pub actor_username: Option<String>,
    pub event_type: String,
    pub message: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Activity event types written to `order_activities.event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    OrderCreated,
    StockDeducted,
    StockRestored,
    AssignmentCleared,
    AssignmentChanged,
    AssignmentClaimed,
    AssignmentNoteUpdated,
    OrderStatusUpdated,
    PaymentStatusUpdated,
    PaymentMethodUpdated,
    FulfillmentStatusUpdated,
    AdminNoteUpdated,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::StockDeducted => "STOCK_DEDUCTED",
            Self::StockRestored => "STOCK_RESTORED",
            Self::AssignmentCleared => "ASSIGNMENT_CLEARED",
            Self::AssignmentChanged => "ASSIGNMENT_CHANGED",
            Self::AssignmentClaimed => "ASSIGNMENT_CLAIMED",
            Self::AssignmentNoteUpdated => "ASSIGNMENT_NOTE_UPDATED",
            Self::OrderStatusUpdated => "ORDER_STATUS_UPDATED",
            Self::PaymentStatusUpdated => "PAYMENT_STATUS_UPDATED",
            Self::PaymentMethodUpdated => "PAYMENT_METHOD_UPDATED",
            Self::FulfillmentStatusUpdated => "FULFILLMENT_STATUS_UPDATED",
            Self::AdminNoteUpdated => "ADMIN_NOTE_UPDATED",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
