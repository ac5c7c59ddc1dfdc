//! Order line items, addresses and totals.
//!
//! Website orders arrive with client-side prices. The server recomputes every
//! line total and the grand total before anything is stored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::ProductId;
use crate::money::round2;
use crate::text::to_nullable;
use crate::validation::{Violations, bounded_amount};

/// Prefix shared by every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ZYT";

/// Default order currency.
pub const DEFAULT_CURRENCY: &str = "TRY";

/// A line item as stored in the order's `items` JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_title: Option<String>,
}

/// A line item as submitted by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[serde(default)]
    pub product_id: Option<String>,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
}

impl OrderItemInput {
    /// Check field constraints, reporting failures relative to the item.
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        if let Some(id) = to_nullable(self.product_id.as_deref()) {
            v.check(id.parse::<ProductId>().is_ok(), || {
                "productId must be a UUID".to_owned()
            });
        }
        v.min_chars("productName", &self.product_name, 2);
        v.check(self.quantity >= 1, || {
            "quantity must not be less than 1".to_owned()
        });
        v.non_negative_amount("unitPrice", self.unit_price, 2);
        v
    }

    /// Convert to the stored form with a computed line total.
    ///
    /// An unparseable `productId` is dropped; call [`Self::validate`] first.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] when the line total does not fit an amount column.
    pub fn into_item(self) -> Result<OrderItem, Violations> {
        let unit_price = round2(self.unit_price);
        let line_total = bounded_amount(
            "lineTotal",
            Decimal::from(self.quantity).checked_mul(unit_price),
        )
        .map(round2)?;
        Ok(OrderItem {
            product_id: to_nullable(self.product_id.as_deref()).and_then(|id| id.parse().ok()),
            product_name: self.product_name,
            sku: to_nullable(self.sku.as_deref()),
            quantity: self.quantity,
            unit_price,
            line_total,
            image_url: to_nullable(self.image_url.as_deref()),
            variant_title: to_nullable(self.variant_title.as_deref()),
        })
    }
}

/// A shipping or billing address blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddress {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
}

impl OrderAddress {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("fullName", &self.full_name, 2);
        v.min_chars("country", &self.country, 2);
        v.min_chars("city", &self.city, 2);
        v.min_chars("line1", &self.line1, 2);
        v
    }
}

/// Monetary totals of an order, all rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

impl OrderTotals {
    /// `grand_total = subtotal + shipping + tax - discount`, where the
    /// subtotal is the sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] when the subtotal or grand total does not fit an
    /// amount column.
    pub fn compute(
        items: &[OrderItem],
        shipping_fee: Decimal,
        discount_amount: Decimal,
        tax_amount: Decimal,
    ) -> Result<Self, Violations> {
        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total));
        let subtotal = bounded_amount("subtotal", subtotal).map(round2)?;
        let shipping_fee = round2(shipping_fee);
        let discount_amount = round2(discount_amount);
        let tax_amount = round2(tax_amount);
        let grand_total = subtotal
            .checked_add(shipping_fee)
            .and_then(|total| total.checked_add(tax_amount))
            .and_then(|total| total.checked_sub(discount_amount));
        Ok(Self {
            subtotal,
            shipping_fee,
            discount_amount,
            tax_amount,
            grand_total: bounded_amount("grandTotal", grand_total).map(round2)?,
        })
    }
}

/// Uppercased currency code, `TRY` when blank.
#[must_use]
pub fn normalize_currency(currency: Option<&str>) -> String {
    to_nullable(currency).map_or_else(|| DEFAULT_CURRENCY.to_owned(), |c| c.to_uppercase())
}

/// `ZYT-YYYYMMDD`, the part of an order number shared by one day's orders.
#[must_use]
pub fn order_number_prefix(date: NaiveDate) -> String {
    format!("{ORDER_NUMBER_PREFIX}-{}", date.format("%Y%m%d"))
}

/// `ZYT-YYYYMMDD-NNNN`. Serials past 9999 keep all their digits.
#[must_use]
pub fn format_order_number(date: NaiveDate, serial: u32) -> String {
    format!("{}-{serial:04}", order_number_prefix(date))
}

/// Per-item stock movement recorded in activity metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub product_id: Option<ProductId>,
    pub sku: Option<String>,
    pub quantity: i32,
}

impl From<&OrderItem> for StockMovement {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            sku: item.sku.clone(),
            quantity: item.quantity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn input(quantity: i32, unit_price: &str) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            product_name: "Gemlik Siyah Zeytin".to_owned(),
            sku: Some(" ERZ-SYZ-1KG-004 ".to_owned()),
            quantity,
            unit_price: dec(unit_price),
            image_url: Some(String::new()),
            variant_title: None,
        }
    }

    #[test]
    fn test_line_total_is_rounded() {
        let item = input(3, "33.33").into_item().unwrap();
        assert_eq!(item.line_total, dec("99.99"));
        assert_eq!(item.sku.as_deref(), Some("ERZ-SYZ-1KG-004"));
        assert_eq!(item.image_url, None);
    }

    #[test]
    fn test_totals() {
        let items = vec![
            input(2, "249.90").into_item().unwrap(),
            input(1, "100").into_item().unwrap(),
        ];
        let totals = OrderTotals::compute(&items, dec("29.9"), dec("50"), dec("0")).unwrap();
        assert_eq!(totals.subtotal, dec("599.80"));
        assert_eq!(totals.grand_total, dec("579.70"));
    }

    #[test]
    fn test_item_validation() {
        let mut bad = input(0, "1.999");
        bad.product_name = "X".to_owned();
        bad.product_id = Some("not-a-uuid".to_owned());
        let v = bad.validate();
        assert_eq!(v.messages.len(), 4);

        let good = input(1, "10.50");
        assert!(good.validate().is_empty());
    }

    #[test]
    fn test_out_of_range_unit_price_is_rejected() {
        let huge = input(2, "79228162514264337593543950335");
        assert_eq!(
            huge.validate().messages,
            vec!["unitPrice must not be greater than 99999999.99"]
        );
        assert_eq!(
            huge.into_item().unwrap_err().messages,
            vec!["lineTotal must not be greater than 99999999.99"]
        );
    }

    #[test]
    fn test_out_of_range_quantity_is_rejected() {
        let bulk = input(i32::MAX, "99999999.99");
        assert!(bulk.validate().is_empty());
        assert_eq!(
            bulk.into_item().unwrap_err().messages,
            vec!["lineTotal must not be greater than 99999999.99"]
        );
    }

    #[test]
    fn test_totals_past_column_range_are_rejected() {
        let items = vec![
            input(1, "99999999.99").into_item().unwrap(),
            input(1, "0.01").into_item().unwrap(),
        ];
        let err = OrderTotals::compute(&items, dec("0"), dec("0"), dec("0")).unwrap_err();
        assert_eq!(
            err.messages,
            vec!["subtotal must not be greater than 99999999.99"]
        );

        let single = vec![input(1, "99999999.99").into_item().unwrap()];
        let err = OrderTotals::compute(&single, dec("10"), dec("0"), dec("0")).unwrap_err();
        assert_eq!(
            err.messages,
            vec!["grandTotal must not be greater than 99999999.99"]
        );
    }

    #[test]
    fn test_valid_product_id_is_kept() {
        let id = ProductId::generate();
        let mut item = input(1, "5");
        item.product_id = Some(id.to_string());
        assert!(item.validate().is_empty());
        assert_eq!(item.into_item().unwrap().product_id, Some(id));
    }

    #[test]
    fn test_address_validation() {
        let address = OrderAddress {
            full_name: "Ayse Yilmaz".to_owned(),
            phone: None,
            country: "TR".to_owned(),
            city: "I".to_owned(),
            district: None,
            postal_code: None,
            line1: "Ataturk Cad. No 5".to_owned(),
            line2: None,
        };
        assert_eq!(
            address.validate().messages,
            vec!["city must be at least 2 characters"]
        );
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(order_number_prefix(date), "ZYT-20260109");
        assert_eq!(format_order_number(date, 7), "ZYT-20260109-0007");
        assert_eq!(format_order_number(date, 12345), "ZYT-20260109-12345");
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(normalize_currency(None), "TRY");
        assert_eq!(normalize_currency(Some("  ")), "TRY");
        assert_eq!(normalize_currency(Some("eur")), "EUR");
    }

    #[test]
    fn test_item_blob_shape() {
        let json = serde_json::to_value(input(2, "12.5").into_item().unwrap()).unwrap();
        assert_eq!(json["unitPrice"], serde_json::json!(12.5));
        assert_eq!(json["lineTotal"], serde_json::json!(25.0));
        assert!(json.get("productId").is_none());
    }
}
