//! Order repository.
//!
//! Reads embed the assigned representative through a `LEFT JOIN` on
//! `admin_users`. Writes that touch stock go through a caller-owned
//! transaction (`&mut PgConnection`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use zeytin_core::{
    AdminRole, AdminUserId, FulfillmentStatus, OrderId, OrderStatus, PaymentMethod,
    PaymentStatus,
};

use super::{RepositoryError, decode_json, encode_json};
use crate::models::{Order, OrderWithAssignee, UserSummary};

const ORDER_COLUMNS: &str = r"
    o.id, o.order_number, o.customer_name, o.customer_email, o.customer_phone,
    o.shipping_address, o.billing_address, o.items, o.subtotal, o.shipping_fee,
    o.discount_amount, o.tax_amount, o.grand_total, o.currency, o.status,
    o.payment_status, o.payment_method, o.payment_provider,
    o.payment_transaction_id, o.fulfillment_status, o.customer_note,
    o.admin_note, o.source, o.assigned_representative_id, o.assignment_note,
    o.assigned_at, o.shipping_method, o.shipping_company, o.tracking_number,
    o.tracking_url, o.stock_deducted, o.placed_at, o.paid_at, o.confirmed_at,
    o.shipped_at, o.delivered_at, o.cancelled_at, o.updated_at
";

const ASSIGNEE_COLUMNS: &str = r"
    r.id AS rep_id, r.username AS rep_username, r.full_name AS rep_full_name,
    r.role AS rep_role, r.is_active AS rep_is_active
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: serde_json::Value,
    billing_address: Option<serde_json::Value>,
    items: serde_json::Value,
    subtotal: Decimal,
    shipping_fee: Decimal,
    discount_amount: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    currency: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    payment_provider: Option<String>,
    payment_transaction_id: Option<String>,
    fulfillment_status: FulfillmentStatus,
    customer_note: Option<String>,
    admin_note: Option<String>,
    source: String,
    assigned_representative_id: Option<Uuid>,
    assignment_note: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    shipping_method: Option<String>,
    shipping_company: Option<String>,
    tracking_number: Option<String>,
    tracking_url: Option<String>,
    stock_deducted: bool,
    placed_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            shipping_address: decode_json("shipping_address", row.shipping_address)?,
            billing_address: row
                .billing_address
                .filter(|value| !value.is_null())
                .map(|value| decode_json("billing_address", value))
                .transpose()?,
            items: decode_json("items", row.items)?,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            discount_amount: row.discount_amount,
            tax_amount: row.tax_amount,
            grand_total: row.grand_total,
            currency: row.currency,
            status: row.status,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            payment_provider: row.payment_provider,
            payment_transaction_id: row.payment_transaction_id,
            fulfillment_status: row.fulfillment_status,
            customer_note: row.customer_note,
            admin_note: row.admin_note,
            source: row.source,
            assigned_representative_id: row.assigned_representative_id.map(AdminUserId::new),
            assignment_note: row.assignment_note,
            assigned_at: row.assigned_at,
            shipping_method: row.shipping_method,
            shipping_company: row.shipping_company,
            tracking_number: row.tracking_number,
            tracking_url: row.tracking_url,
            stock_deducted: row.stock_deducted,
            placed_at: row.placed_at,
            paid_at: row.paid_at,
            confirmed_at: row.confirmed_at,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderWithAssigneeRow {
    #[sqlx(flatten)]
    order: OrderRow,
    rep_id: Option<Uuid>,
    rep_username: Option<String>,
    rep_full_name: Option<String>,
    rep_role: Option<AdminRole>,
    rep_is_active: Option<bool>,
}

impl TryFrom<OrderWithAssigneeRow> for OrderWithAssignee {
    type Error = RepositoryError;

    fn try_from(row: OrderWithAssigneeRow) -> Result<Self, Self::Error> {
        let assigned_representative = match (row.rep_id, row.rep_username, row.rep_role) {
            (Some(id), Some(username), Some(role)) => Some(UserSummary {
                id: AdminUserId::new(id),
                username,
                full_name: row.rep_full_name.unwrap_or_default(),
                role,
                is_active: row.rep_is_active.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            order: row.order.try_into()?,
            assigned_representative,
        })
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Which orders an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderScope {
    /// Every order (admins).
    #[default]
    All,
    /// Only orders assigned to this representative.
    AssignedTo(AdminUserId),
    /// Orders assigned to this representative or not assigned at all.
    AssignedToOrUnassigned(AdminUserId),
}

impl OrderScope {
    const fn bind_values(self) -> (Option<AdminUserId>, bool) {
        match self {
            Self::All => (None, false),
            Self::AssignedTo(id) => (Some(id), false),
            Self::AssignedToOrUnassigned(id) => (Some(id), true),
        }
    }
}

/// Optional list filters. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub assigned_representative_id: Option<AdminUserId>,
    pub search: Option<String>,
    pub scope: OrderScope,
}

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_count: i64,
    pub total_revenue: Decimal,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusCountRow {
    status: OrderStatus,
    order_count: i64,
    revenue: Decimal,
}

/// Fold per-status counts into the dashboard summary. Cancelled and refunded
/// orders are listed in `by_status` but excluded from the totals.
fn summarize(rows: impl IntoIterator<Item = (OrderStatus, i64, Decimal)>) -> OrderSummary {
    let mut by_status: BTreeMap<String, i64> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_owned(), 0))
        .collect();
    let mut order_count = 0;
    let mut total_revenue = Decimal::ZERO;

    for (status, count, revenue) in rows {
        by_status.insert(status.as_str().to_owned(), count);
        if !status.is_stock_blocking() {
            order_count += count;
            total_revenue += revenue;
        }
    }

    OrderSummary {
        order_count,
        total_revenue,
        by_status,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderWithAssignee>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}, {ASSIGNEE_COLUMNS}
            FROM orders o
            LEFT JOIN admin_users r ON r.id = o.assigned_representative_id
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::payment_status IS NULL OR o.payment_status = $2)
              AND ($3::payment_method IS NULL OR o.payment_method = $3)
              AND ($4::fulfillment_status IS NULL OR o.fulfillment_status = $4)
              AND ($5::uuid IS NULL OR o.assigned_representative_id = $5)
              AND ($6::text IS NULL
                   OR o.order_number ILIKE $6
                   OR o.customer_name ILIKE $6
                   OR o.customer_email ILIKE $6
                   OR o.customer_phone ILIKE $6)
              AND ($7::uuid IS NULL
                   OR o.assigned_representative_id = $7
                   OR ($8 AND o.assigned_representative_id IS NULL))
            ORDER BY o.placed_at DESC
            "
        );
        let pattern = filter.search.as_deref().map(|term| format!("%{term}%"));
        let (scope_id, include_unassigned) = filter.scope.bind_values();

        let rows = sqlx::query_as::<_, OrderWithAssigneeRow>(&sql)
            .bind(filter.status)
            .bind(filter.payment_status)
            .bind(filter.payment_method)
            .bind(filter.fulfillment_status)
            .bind(filter.assigned_representative_id)
            .bind(pattern)
            .bind(scope_id)
            .bind(include_unassigned)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Order counts and revenue within `scope`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, scope: OrderScope) -> Result<OrderSummary, RepositoryError> {
        let (scope_id, include_unassigned) = scope.bind_values();
        let rows = sqlx::query_as::<_, StatusCountRow>(
            r"
            SELECT status,
                   COUNT(*) AS order_count,
                   COALESCE(SUM(grand_total), 0) AS revenue
            FROM orders
            WHERE ($1::uuid IS NULL
                   OR assigned_representative_id = $1
                   OR ($2 AND assigned_representative_id IS NULL))
            GROUP BY status
            ",
        )
        .bind(scope_id)
        .bind(include_unassigned)
        .fetch_all(self.pool)
        .await?;

        Ok(summarize(
            rows.into_iter()
                .map(|row| (row.status, row.order_count, row.revenue)),
        ))
    }

    /// Get an order with its assignee.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn get_by_id(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithAssignee>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}, {ASSIGNEE_COLUMNS}
            FROM orders o
            LEFT JOIN admin_users r ON r.id = o.assigned_representative_id
            WHERE o.id = $1
            "
        );
        let row = sqlx::query_as::<_, OrderWithAssigneeRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an order by its public number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.order_number = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_number)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Number of orders whose number starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_with_prefix(
        conn: &mut PgConnection,
        prefix: &str,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE order_number LIKE $1 || '%'",
        )
        .bind(prefix)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Whether an order number is already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn number_exists(
        conn: &mut PgConnection,
        order_number: &str,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1)",
        )
        .bind(order_number)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Lock an order row for an update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a new order inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(conn: &mut PgConnection, order: &Order) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"
            WITH o AS (
                INSERT INTO orders (
                    id, order_number, customer_name, customer_email, customer_phone,
                    shipping_address, billing_address, items, subtotal, shipping_fee,
                    discount_amount, tax_amount, grand_total, currency, status,
                    payment_status, payment_method, payment_provider,
                    payment_transaction_id, fulfillment_status, customer_note,
                    admin_note, source, assigned_representative_id, assignment_note,
                    assigned_at, shipping_method, shipping_company, tracking_number,
                    tracking_url, stock_deducted, placed_at, paid_at, confirmed_at,
                    shipped_at, delivered_at, cancelled_at
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                    $27, $28, $29, $30, $31, $32, $33, $34, $35, $36, $37
                )
                RETURNING *
            )
            SELECT {ORDER_COLUMNS} FROM o
            "
        );
        let shipping_address = encode_json("shipping_address", &order.shipping_address)?;
        let billing_address = order
            .billing_address
            .as_ref()
            .map(|address| encode_json("billing_address", address))
            .transpose()?;
        let items = encode_json("items", &order.items)?;

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(&order.customer_name)
            .bind(&order.customer_email)
            .bind(order.customer_phone.as_deref())
            .bind(shipping_address)
            .bind(billing_address)
            .bind(items)
            .bind(order.subtotal)
            .bind(order.shipping_fee)
            .bind(order.discount_amount)
            .bind(order.tax_amount)
            .bind(order.grand_total)
            .bind(&order.currency)
            .bind(order.status)
            .bind(order.payment_status)
            .bind(order.payment_method)
            .bind(order.payment_provider.as_deref())
            .bind(order.payment_transaction_id.as_deref())
            .bind(order.fulfillment_status)
            .bind(order.customer_note.as_deref())
            .bind(order.admin_note.as_deref())
            .bind(&order.source)
            .bind(order.assigned_representative_id)
            .bind(order.assignment_note.as_deref())
            .bind(order.assigned_at)
            .bind(order.shipping_method.as_deref())
            .bind(order.shipping_company.as_deref())
            .bind(order.tracking_number.as_deref())
            .bind(order.tracking_url.as_deref())
            .bind(order.stock_deducted)
            .bind(order.placed_at)
            .bind(order.paid_at)
            .bind(order.confirmed_at)
            .bind(order.shipped_at)
            .bind(order.delivered_at)
            .bind(order.cancelled_at)
            .fetch_one(conn)
            .await
            .map_err(|e| RepositoryError::conflict_on_unique(e, "order number already exists"))?;

        row.try_into()
    }

    /// Persist the mutable workflow columns of an order.
    ///
    /// Customer data and totals are fixed at checkout and are not written
    /// here. Line items are rewritten because stock adjustments fill in the
    /// resolved `productId`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_workflow(
        conn: &mut PgConnection,
        order: &Order,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                payment_status = $3,
                payment_method = $4,
                payment_provider = $5,
                payment_transaction_id = $6,
                fulfillment_status = $7,
                admin_note = $8,
                assigned_representative_id = $9,
                assignment_note = $10,
                assigned_at = $11,
                shipping_method = $12,
                shipping_company = $13,
                tracking_number = $14,
                tracking_url = $15,
                stock_deducted = $16,
                paid_at = $17,
                confirmed_at = $18,
                shipped_at = $19,
                delivered_at = $20,
                cancelled_at = $21,
                items = $22,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(order.payment_provider.as_deref())
        .bind(order.payment_transaction_id.as_deref())
        .bind(order.fulfillment_status)
        .bind(order.admin_note.as_deref())
        .bind(order.assigned_representative_id)
        .bind(order.assignment_note.as_deref())
        .bind(order.assigned_at)
        .bind(order.shipping_method.as_deref())
        .bind(order.shipping_company.as_deref())
        .bind(order.tracking_number.as_deref())
        .bind(order.tracking_url.as_deref())
        .bind(order.stock_deducted)
        .bind(order.paid_at)
        .bind(order.confirmed_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(encode_json("items", &order.items)?)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_excludes_blocked_statuses_from_totals() {
        let summary = summarize([
            (OrderStatus::New, 3, Decimal::new(30_000, 2)),
            (OrderStatus::Delivered, 1, Decimal::new(12_550, 2)),
            (OrderStatus::Cancelled, 2, Decimal::new(99_900, 2)),
        ]);

        assert_eq!(summary.order_count, 4);
        assert_eq!(summary.total_revenue, Decimal::new(42_550, 2));
        assert_eq!(summary.by_status["CANCELLED"], 2);
        assert_eq!(summary.by_status["REFUNDED"], 0);
        assert_eq!(summary.by_status.len(), OrderStatus::ALL.len());
    }

    #[test]
    fn test_scope_bind_values() {
        let id = AdminUserId::generate();
        assert_eq!(OrderScope::All.bind_values(), (None, false));
        assert_eq!(OrderScope::AssignedTo(id).bind_values(), (Some(id), false));
        assert_eq!(
            OrderScope::AssignedToOrUnassigned(id).bind_values(),
            (Some(id), true)
        );
    }
}
