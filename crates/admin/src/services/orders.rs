//! Order service: website checkout, the admin order workflow and the
//! representative access rules.
//!
//! Representatives only see orders assigned to them or not assigned at all,
//! and may only work on orders assigned to themselves. Touching an unassigned
//! order claims it.
//!
//! Every write that changes stock runs in one transaction with the order row
//! and the activity log, with product rows locked `FOR UPDATE`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use zeytin_core::inventory::{StockAction, resolve_stock_action};
use zeytin_core::money::to_cents_string;
use zeytin_core::orders::{
    OrderAddress, OrderItem, OrderItemInput, OrderTotals, StockMovement, format_order_number,
    normalize_currency, order_number_prefix,
};
use zeytin_core::text::to_nullable;
use zeytin_core::validation::Violations;
use zeytin_core::{
    AdminUserId, Email, FulfillmentStatus, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
};

use super::realtime::{EventBus, EventName};
use crate::db::activities::{Actor, NewActivity};
use crate::db::orders::{OrderFilter, OrderScope, OrderSummary};
use crate::db::{ActivityRepository, AdminUserRepository, OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::order::SOURCE_WEBSITE;
use crate::models::{
    ActivityKind, AdminUser, CurrentAdmin, Order, OrderActivity, OrderWithAssignee, Product,
};

fn order_not_found() -> AppError {
    AppError::NotFound("order not found".to_owned())
}

// =============================================================================
// Access rules
// =============================================================================

/// Which orders `actor` may list.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when a representative asks for another
/// representative's orders.
pub fn resolve_scope(
    actor: &CurrentAdmin,
    requested_representative: Option<AdminUserId>,
    mine: bool,
) -> Result<OrderScope> {
    if actor.is_admin() {
        return Ok(OrderScope::All);
    }
    if requested_representative.is_some_and(|id| id != actor.id) {
        return Err(AppError::Forbidden(
            "representatives can only view their own orders".to_owned(),
        ));
    }
    if mine {
        Ok(OrderScope::AssignedTo(actor.id))
    } else {
        Ok(OrderScope::AssignedToOrUnassigned(actor.id))
    }
}

/// Representatives may not open orders assigned to someone else.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if access is denied.
pub fn ensure_can_access(actor: &CurrentAdmin, order: &Order) -> Result<()> {
    if actor.is_admin() {
        return Ok(());
    }
    match order.assigned_representative_id {
        Some(assignee) if assignee != actor.id => Err(AppError::Forbidden(
            "you do not have access to this order".to_owned(),
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// `GET /api/orders` and `GET /api/orders/summary` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub assigned_representative_id: Option<AdminUserId>,
    pub mine: Option<String>,
    pub search: Option<String>,
}

impl OrderListQuery {
    /// `mine=true`; any other value is false.
    #[must_use]
    pub fn mine(&self) -> bool {
        self.mine.as_deref() == Some("true")
    }

    fn into_filter(self, scope: OrderScope) -> OrderFilter {
        OrderFilter {
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            fulfillment_status: self.fulfillment_status,
            assigned_representative_id: self.assigned_representative_id,
            search: to_nullable(self.search.as_deref()),
            scope,
        }
    }
}

/// `PATCH /api/orders/{id}` body. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderInput {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_provider: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub shipping_method: Option<String>,
    pub admin_note: Option<String>,
    pub shipping_company: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub assigned_representative_id: Option<AdminUserId>,
    #[serde(default)]
    pub clear_assignment: bool,
    pub assignment_note: Option<String>,
}

/// `POST /api/shop/orders` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopOrderInput {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: OrderAddress,
    pub billing_address: Option<OrderAddress>,
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub currency: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_provider: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub shipping_method: Option<String>,
    pub customer_note: Option<String>,
}

impl CreateShopOrderInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("customerName", &self.customer_name, 2);
        v.check(Email::parse(&self.customer_email).is_ok(), || {
            "customerEmail must be an email".to_owned()
        });
        v.extend_prefixed("shippingAddress", self.shipping_address.validate());
        if let Some(billing) = &self.billing_address {
            v.extend_prefixed("billingAddress", billing.validate());
        }
        v.check(!self.items.is_empty(), || "items must not be empty".to_owned());
        for (index, item) in self.items.iter().enumerate() {
            v.extend_prefixed(&format!("items.{index}"), item.validate());
        }
        v.non_negative_amount("shippingFee", self.shipping_fee, 2);
        v.non_negative_amount("discountAmount", self.discount_amount, 2);
        v.non_negative_amount("taxAmount", self.tax_amount, 2);
        v
    }

    /// Build the order row. `items` are the converted line items, possibly
    /// with product links filled in by the stock deduction.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] when the order totals do not fit an amount column.
    pub fn into_order(
        self,
        order_number: String,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> std::result::Result<Order, Violations> {
        let totals = OrderTotals::compute(
            &items,
            self.shipping_fee,
            self.discount_amount,
            self.tax_amount,
        )?;
        let payment_status = self.payment_status.unwrap_or_default();

        Ok(Order {
            id: OrderId::generate(),
            order_number,
            customer_name: self.customer_name.trim().to_owned(),
            customer_email: self.customer_email.trim().to_owned(),
            customer_phone: to_nullable(self.customer_phone.as_deref()),
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            items,
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            grand_total: totals.grand_total,
            currency: normalize_currency(self.currency.as_deref()),
            status: OrderStatus::New,
            payment_status,
            payment_method: self.payment_method.unwrap_or_default(),
            payment_provider: to_nullable(self.payment_provider.as_deref()),
            payment_transaction_id: to_nullable(self.payment_transaction_id.as_deref()),
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            customer_note: to_nullable(self.customer_note.as_deref()),
            admin_note: None,
            source: SOURCE_WEBSITE.to_owned(),
            assigned_representative_id: None,
            assignment_note: None,
            assigned_at: None,
            shipping_method: to_nullable(self.shipping_method.as_deref()),
            shipping_company: None,
            tracking_number: None,
            tracking_url: None,
            stock_deducted: true,
            placed_at: now,
            paid_at: (payment_status == PaymentStatus::Paid).then_some(now),
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        })
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// Apply the status, payment, fulfillment and note changes of `input`.
///
/// Returns the activities to record. Assignment changes are handled by the
/// service because they need a representative lookup.
pub fn apply_workflow_changes(
    order: &mut Order,
    input: &UpdateOrderInput,
    now: DateTime<Utc>,
) -> Vec<NewActivity> {
    let mut activities = Vec::new();

    if let Some(next) = input.status
        && next != order.status
    {
        let previous = order.status;
        order.status = next;
        let stamp = match next {
            OrderStatus::Confirmed => Some(&mut order.confirmed_at),
            OrderStatus::Shipped => Some(&mut order.shipped_at),
            OrderStatus::Delivered => Some(&mut order.delivered_at),
            OrderStatus::Cancelled => Some(&mut order.cancelled_at),
            _ => None,
        };
        if let Some(stamp) = stamp {
            stamp.get_or_insert(now);
        }
        activities.push(NewActivity::new(
            ActivityKind::OrderStatusUpdated,
            format!("Order status {previous} -> {next}"),
        ));
    }

    if let Some(next) = input.payment_status
        && next != order.payment_status
    {
        let previous = order.payment_status;
        order.payment_status = next;
        if next == PaymentStatus::Paid {
            order.paid_at.get_or_insert(now);
        } else {
            order.paid_at = None;
        }
        activities.push(NewActivity::new(
            ActivityKind::PaymentStatusUpdated,
            format!("Payment status {previous} -> {next}"),
        ));
    }

    if let Some(next) = input.payment_method
        && next != order.payment_method
    {
        let previous = order.payment_method;
        order.payment_method = next;
        activities.push(NewActivity::new(
            ActivityKind::PaymentMethodUpdated,
            format!("Payment method {previous} -> {next}"),
        ));
    }

    if let Some(provider) = &input.payment_provider {
        order.payment_provider = to_nullable(Some(provider.as_str()));
    }
    if let Some(transaction_id) = &input.payment_transaction_id {
        order.payment_transaction_id = to_nullable(Some(transaction_id.as_str()));
    }

    if let Some(next) = input.fulfillment_status
        && next != order.fulfillment_status
    {
        let previous = order.fulfillment_status;
        order.fulfillment_status = next;
        match next {
            FulfillmentStatus::Shipped => {
                order.shipped_at.get_or_insert(now);
            }
            FulfillmentStatus::Delivered => {
                order.delivered_at.get_or_insert(now);
            }
            _ => {}
        }
        activities.push(NewActivity::new(
            ActivityKind::FulfillmentStatusUpdated,
            format!("Fulfillment status {previous} -> {next}"),
        ));
    }

    if let Some(method) = &input.shipping_method {
        order.shipping_method = to_nullable(Some(method.as_str()));
    }
    if let Some(note) = &input.admin_note {
        order.admin_note = to_nullable(Some(note.as_str()));
        activities.push(NewActivity::new(
            ActivityKind::AdminNoteUpdated,
            "Admin note updated",
        ));
    }
    if let Some(company) = &input.shipping_company {
        order.shipping_company = to_nullable(Some(company.as_str()));
    }
    if let Some(number) = &input.tracking_number {
        order.tracking_number = to_nullable(Some(number.as_str()));
    }
    if let Some(url) = &input.tracking_url {
        order.tracking_url = to_nullable(Some(url.as_str()));
    }

    activities
}

fn stock_movements(items: &[OrderItem]) -> Vec<StockMovement> {
    items.iter().map(StockMovement::from).collect()
}

/// The activity recorded after a status-driven stock adjustment.
fn stock_activity(action: StockAction, status: OrderStatus, items: &[OrderItem]) -> NewActivity {
    let meta = json!({ "status": status, "items": stock_movements(items) });
    match action {
        StockAction::Restore => NewActivity::new(
            ActivityKind::StockRestored,
            "Stock restored because the order was cancelled or refunded",
        ),
        StockAction::Deduct => NewActivity::new(
            ActivityKind::StockDeducted,
            "Stock deducted again because the order is active",
        ),
    }
    .with_meta(meta)
}

fn representative_meta(id: AdminUserId, username: &str) -> serde_json::Value {
    json!({ "representativeId": id, "representativeUsername": username })
}

/// Find the product an order line refers to, locking its row.
///
/// Lines are matched by `productId`, then product SKU, then variant SKU.
/// Lines that match nothing are not stock-tracked.
async fn lock_item_product(conn: &mut PgConnection, item: &OrderItem) -> Result<Option<Product>> {
    if let Some(product_id) = item.product_id {
        let product = ProductRepository::lock_by_id(&mut *conn, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product not found: {product_id}")))?;
        return Ok(Some(product));
    }

    let Some(sku) = item.sku.as_deref() else {
        return Ok(None);
    };
    if let Some(product) = ProductRepository::lock_by_sku(&mut *conn, sku).await? {
        return Ok(Some(product));
    }
    Ok(ProductRepository::lock_by_variant_sku(&mut *conn, sku).await?)
}

/// Apply `action` to every stock-tracked line, filling in resolved product
/// links.
async fn adjust_stock(
    conn: &mut PgConnection,
    items: &mut [OrderItem],
    action: StockAction,
) -> Result<()> {
    for item in items.iter_mut() {
        let Some(product) = lock_item_product(&mut *conn, item).await? else {
            continue;
        };
        item.product_id.get_or_insert(product.id);

        let mut stock = product.stock_view();
        stock
            .apply_delta(item.sku.as_deref(), action.signed_delta(item.quantity))
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        ProductRepository::update_stock(&mut *conn, product.id, stock.stock, &stock.variants)
            .await?;
    }
    Ok(())
}

async fn next_order_number(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<String> {
    let date = now.date_naive();
    let prefix = order_number_prefix(date);
    let taken_today = OrderRepository::count_with_prefix(&mut *conn, &prefix).await?;
    let mut serial = u32::try_from(taken_today)
        .map_err(|_| AppError::Internal("order count out of range".to_owned()))?
        .saturating_add(1);

    loop {
        let candidate = format_order_number(date, serial);
        if !OrderRepository::number_exists(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
        serial = serial.saturating_add(1);
    }
}

// =============================================================================
// Service
// =============================================================================

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
    users: AdminUserRepository<'a>,
    activities: ActivityRepository<'a>,
    events: &'a EventBus,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, events: &'a EventBus) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
            users: AdminUserRepository::new(pool),
            activities: ActivityRepository::new(pool),
            events,
        }
    }

    /// Orders visible to `actor`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if a representative filters by someone
    /// else. Returns `AppError::Database` if the query fails.
    pub async fn list(
        &self,
        actor: &CurrentAdmin,
        query: OrderListQuery,
    ) -> Result<Vec<OrderWithAssignee>> {
        let scope = resolve_scope(actor, query.assigned_representative_id, query.mine())?;
        Ok(self.orders.list(&query.into_filter(scope)).await?)
    }

    /// Dashboard totals for the orders visible to `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn summary(&self, actor: &CurrentAdmin, mine: bool) -> Result<OrderSummary> {
        let scope = resolve_scope(actor, None, mine)?;
        Ok(self.orders.summary(scope).await?)
    }

    /// One order with its assignee.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist and
    /// `AppError::Forbidden` if `actor` may not see it.
    pub async fn get(&self, actor: &CurrentAdmin, id: OrderId) -> Result<OrderWithAssignee> {
        let order = self.orders.get_by_id(id).await?.ok_or_else(order_not_found)?;
        ensure_can_access(actor, &order.order)?;
        Ok(order)
    }

    /// The audit trail of an order, newest first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn activities(&self, actor: &CurrentAdmin, id: OrderId) -> Result<Vec<OrderActivity>> {
        self.get(actor, id).await?;
        Ok(self.activities.list_for_order(id).await?)
    }

    /// Public order lookup by number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the number is unknown.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order> {
        self.orders
            .get_by_number(order_number.trim())
            .await?
            .ok_or_else(order_not_found)
    }

    /// Place a website order and deduct its stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the body is invalid,
    /// `AppError::NotFound` if a line names an unknown product and
    /// `AppError::Conflict` if stock is insufficient.
    pub async fn create_from_website(&self, input: CreateShopOrderInput) -> Result<OrderWithAssignee> {
        input.validate().into_result()?;

        let mut input = input;
        let mut items = std::mem::take(&mut input.items)
            .into_iter()
            .map(OrderItemInput::into_item)
            .collect::<std::result::Result<Vec<OrderItem>, _>>()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let order_number = next_order_number(&mut *tx, now).await?;
        adjust_stock(&mut *tx, &mut items, StockAction::Deduct).await?;

        let order = input.into_order(order_number, items, now)?;
        let order = OrderRepository::insert(&mut *tx, &order).await?;

        let activities = [
            NewActivity::new(ActivityKind::OrderCreated, "Website order created")
                .with_meta(json!({ "source": SOURCE_WEBSITE })),
            NewActivity::new(ActivityKind::StockDeducted, "Stock deducted for order items")
                .with_meta(json!({ "items": stock_movements(&order.items) })),
        ];
        ActivityRepository::insert_all(&mut *tx, order.id, Actor::default(), &activities).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            grand_total = %order.grand_total,
            "Website order created"
        );
        self.events
            .publish(
                EventName::OrdersCreated,
                json!({
                    "orderId": order.id,
                    "orderNumber": order.order_number,
                    "grandTotal": to_cents_string(order.grand_total),
                    "status": order.status,
                }),
            )
            .await;

        Ok(OrderWithAssignee {
            order,
            assigned_representative: None,
        })
    }

    /// Apply a workflow update on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order or the target
    /// representative doesn't exist, `AppError::Forbidden` if `actor` may not
    /// make the change and `AppError::Conflict` if re-deducting stock fails.
    pub async fn update(
        &self,
        actor: &CurrentAdmin,
        id: OrderId,
        input: UpdateOrderInput,
    ) -> Result<OrderWithAssignee> {
        let mut tx = self.pool.begin().await?;
        let mut order = OrderRepository::lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(order_not_found)?;
        ensure_can_access(actor, &order)?;

        let now = Utc::now();
        let previous_status = order.status;
        let mut activities = self.apply_assignment(&mut order, &input, actor, now).await?;

        if !actor.is_admin() && order.assigned_representative_id != Some(actor.id) {
            return Err(AppError::Forbidden(
                "order is assigned to another representative".to_owned(),
            ));
        }

        activities.extend(apply_workflow_changes(&mut order, &input, now));

        if let Some(action) =
            resolve_stock_action(previous_status, order.status, order.stock_deducted)
        {
            adjust_stock(&mut *tx, &mut order.items, action).await?;
            order.stock_deducted = action == StockAction::Deduct;
            activities.push(stock_activity(action, order.status, &order.items));
        }

        OrderRepository::update_workflow(&mut *tx, &order).await?;
        let audit_actor = Actor {
            id: Some(actor.id),
            username: Some(&actor.username),
        };
        ActivityRepository::insert_all(&mut *tx, order.id, audit_actor, &activities).await?;
        tx.commit().await?;

        self.events
            .publish(
                EventName::OrdersUpdated,
                json!({
                    "orderId": order.id,
                    "orderNumber": order.order_number,
                    "status": order.status,
                    "paymentStatus": order.payment_status,
                    "fulfillmentStatus": order.fulfillment_status,
                    "assignedRepresentativeId": order.assigned_representative_id,
                }),
            )
            .await;

        self.get(actor, id).await
    }

    async fn apply_assignment(
        &self,
        order: &mut Order,
        input: &UpdateOrderInput,
        actor: &CurrentAdmin,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewActivity>> {
        let mut activities = Vec::new();

        if input.clear_assignment {
            if !actor.is_admin() {
                return Err(AppError::Forbidden(
                    "only admins can clear an assignment".to_owned(),
                ));
            }
            if let Some(previous_id) = order.assigned_representative_id.take() {
                let previous = self
                    .users
                    .get_by_id(previous_id)
                    .await?
                    .map_or_else(|| "representative".to_owned(), |user| user.full_name);
                order.assigned_at = None;
                activities.push(NewActivity::new(
                    ActivityKind::AssignmentCleared,
                    format!("Assignment cleared (previous: {previous})"),
                ));
            }
        }

        if let Some(target) = input.assigned_representative_id {
            if !actor.is_admin() && target != actor.id {
                return Err(AppError::Forbidden(
                    "representatives can only assign orders to themselves".to_owned(),
                ));
            }
            let representative = self.active_representative(target).await?;
            if order.assigned_representative_id != Some(representative.id) {
                order.assigned_representative_id = Some(representative.id);
                order.assigned_at = Some(now);
                activities.push(
                    NewActivity::new(
                        ActivityKind::AssignmentChanged,
                        format!("Order assigned to {}", representative.full_name),
                    )
                    .with_meta(representative_meta(representative.id, &representative.username)),
                );
            }
        } else if !actor.is_admin() && order.assigned_representative_id.is_none() {
            let representative = self.active_representative(actor.id).await?;
            order.assigned_representative_id = Some(representative.id);
            order.assigned_at = Some(now);
            activities.push(
                NewActivity::new(ActivityKind::AssignmentClaimed, "Order claimed by representative")
                    .with_meta(representative_meta(representative.id, &representative.username)),
            );
        }

        if let Some(note) = &input.assignment_note {
            order.assignment_note = to_nullable(Some(note.as_str()));
            activities.push(NewActivity::new(
                ActivityKind::AssignmentNoteUpdated,
                "Assignment note updated",
            ));
        }

        Ok(activities)
    }

    async fn active_representative(&self, id: AdminUserId) -> Result<AdminUser> {
        self.users
            .get_active_representative(id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("representative not found or inactive".to_owned())
            })
    }
}
