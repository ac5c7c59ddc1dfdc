//! Catalog product model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use zeytin_core::catalog::ProductVariant;
use zeytin_core::inventory::ProductStock;
use zeytin_core::pricing::{ExpenseItem, PricingPolicy, PricingSummary};
use zeytin_core::{CategoryId, ProductId};

use super::category::Category;

/// A product row.
///
/// Top-level `NUMERIC` columns serialize as decimal strings; values inside
/// the JSONB blobs (variants, policy, summary) serialize as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub tax_rate: Decimal,
    pub vat_included: bool,
    pub stock: i32,
    pub min_stock: i32,
    pub weight: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub length: Option<Decimal>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub featured_image: Option<String>,
    pub has_variants: bool,
    pub variants: Vec<ProductVariant>,
    pub pricing_policy: PricingPolicy,
    pub expense_items: Vec<ExpenseItem>,
    pub pricing_summary: PricingSummary,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Vec<String>,
    pub is_active: bool,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The stock-bearing fields, for inventory adjustments.
    #[must_use]
    pub fn stock_view(&self) -> ProductStock {
        ProductStock {
            name: self.name.clone(),
            stock: self.stock,
            has_variants: self.has_variants,
            variants: self.variants.clone(),
        }
    }
}

/// A product with its category embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}
