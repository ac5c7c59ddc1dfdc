//! Order-driven stock reconciliation.
//!
//! Stock is deducted when a website order is placed. After that the order's
//! status decides whether it should hold stock:
//!
//! | previous      | next          | `stock_deducted` | action  |
//! |---------------|---------------|------------------|---------|
//! | active        | cancelled/refunded | `true`      | restore |
//! | cancelled/refunded | active   | `false`          | deduct  |
//! | anything else |               |                  | none    |
//!
//! The `stock_deducted` flag flips in the same transaction as the stock
//! change, so a restore can never be applied twice.

use thiserror::Error;

use crate::catalog::{ProductVariant, variant_stock_total};
use crate::status::OrderStatus;

/// Direction of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockAction {
    /// Take stock out for an active order.
    Deduct,
    /// Put stock back for a cancelled or refunded order.
    Restore,
}

impl StockAction {
    /// Signed stock change for `quantity` units.
    #[must_use]
    pub const fn signed_delta(self, quantity: i32) -> i32 {
        match self {
            Self::Deduct => quantity.saturating_neg(),
            Self::Restore => quantity,
        }
    }
}

/// Decide which stock adjustment a status transition requires.
#[must_use]
pub const fn resolve_stock_action(
    previous: OrderStatus,
    next: OrderStatus,
    stock_deducted: bool,
) -> Option<StockAction> {
    let was_blocked = previous.is_stock_blocking();
    let is_blocked = next.is_stock_blocking();

    if !was_blocked && is_blocked && stock_deducted {
        return Some(StockAction::Restore);
    }
    if was_blocked && !is_blocked && !stock_deducted {
        return Some(StockAction::Deduct);
    }
    None
}

/// A stock adjustment would leave a product or variant below zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "insufficient stock for {product}{}",
    .sku.as_deref().map(|sku| format!(" ({sku})")).unwrap_or_default()
)]
pub struct InsufficientStock {
    /// Product name.
    pub product: String,
    /// Variant SKU, when the shortfall is on a variant.
    pub sku: Option<String>,
}

/// The stock-bearing part of a product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStock {
    pub name: String,
    pub stock: i32,
    pub has_variants: bool,
    pub variants: Vec<ProductVariant>,
}

impl ProductStock {
    /// Apply `delta` units for an order line.
    ///
    /// When the product has variants and `sku` names one of them, the
    /// variant absorbs the change and the product stock is recomputed as the
    /// sum of variant stocks. Otherwise the product stock changes directly.
    ///
    /// # Errors
    ///
    /// Returns [`InsufficientStock`] if the result would be negative. Nothing
    /// is modified in that case.
    pub fn apply_delta(&mut self, sku: Option<&str>, delta: i32) -> Result<(), InsufficientStock> {
        if self.has_variants
            && let Some(sku) = sku
            && let Some(variant) = self.variants.iter_mut().find(|v| v.sku == sku)
        {
            let next = variant.stock.saturating_add(delta);
            if next < 0 {
                return Err(InsufficientStock {
                    product: self.name.clone(),
                    sku: Some(variant.sku.clone()),
                });
            }
            variant.stock = next;
            self.stock = variant_stock_total(&self.variants);
            return Ok(());
        }

        let next = self.stock.saturating_add(delta);
        if next < 0 {
            return Err(InsufficientStock {
                product: self.name.clone(),
                sku: None,
            });
        }
        self.stock = next;
        Ok(())
    }
}
