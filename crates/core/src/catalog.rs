//! Catalog value types shared by the admin API and the seed data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::text::to_nullable;

/// Slug used when a category name transliterates to nothing.
pub const CATEGORY_SLUG_FALLBACK: &str = "kategori";
/// Slug used when a product name transliterates to nothing.
pub const PRODUCT_SLUG_FALLBACK: &str = "urun";

/// A sellable variant of a product, stored in the product's `variants` JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub title: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_one: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_two: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_three: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Trim titles, SKUs and option labels. Blank options become `None`.
#[must_use]
pub fn normalize_variants(variants: &[ProductVariant]) -> Vec<ProductVariant> {
    variants
        .iter()
        .map(|variant| ProductVariant {
            title: variant.title.trim().to_owned(),
            sku: variant.sku.trim().to_owned(),
            price: variant.price,
            stock: variant.stock,
            option_one: to_nullable(variant.option_one.as_deref()),
            option_two: to_nullable(variant.option_two.as_deref()),
            option_three: to_nullable(variant.option_three.as_deref()),
            is_default: variant.is_default,
        })
        .collect()
}

/// Product-level stock: the sum of variant stocks for variant products,
/// otherwise the requested stock floored at zero.
#[must_use]
pub fn resolve_product_stock(fallback: i32, has_variants: bool, variants: &[ProductVariant]) -> i32 {
    if has_variants && !variants.is_empty() {
        return variant_stock_total(variants);
    }
    fallback.max(0)
}

/// Sum of all variant stocks.
#[must_use]
pub fn variant_stock_total(variants: &[ProductVariant]) -> i32 {
    variants
        .iter()
        .fold(0_i32, |total, variant| total.saturating_add(variant.stock))
}

/// Choose the featured image: the requested one when it is part of the
/// gallery, otherwise the first gallery image.
#[must_use]
pub fn pick_featured_image(images: &[String], requested: Option<&str>) -> Option<String> {
    let first = images.first()?;
    let preferred = to_nullable(requested);

    match preferred {
        Some(preferred) if images.contains(&preferred) => Some(preferred),
        _ => Some(first.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(sku: &str, stock: i32) -> ProductVariant {
        ProductVariant {
            title: format!(" {sku} "),
            sku: format!("{sku} "),
            price: Decimal::new(9990, 2),
            stock,
            option_one: Some("  ".to_owned()),
            option_two: Some(" 1L ".to_owned()),
            option_three: None,
            is_default: false,
        }
    }

    #[test]
    fn test_normalize_variants() {
        let normalized = normalize_variants(&[variant("ZYT-1L", 3)]);
        let first = normalized.first().cloned();
        assert_eq!(
            first,
            Some(ProductVariant {
                title: "ZYT-1L".to_owned(),
                sku: "ZYT-1L".to_owned(),
                price: Decimal::new(9990, 2),
                stock: 3,
                option_one: None,
                option_two: Some("1L".to_owned()),
                option_three: None,
                is_default: false,
            })
        );
    }

    #[test]
    fn test_resolve_product_stock() {
        let variants = vec![variant("A", 4), variant("B", 6)];
        assert_eq!(resolve_product_stock(99, true, &variants), 10);
        assert_eq!(resolve_product_stock(99, false, &variants), 99);
        assert_eq!(resolve_product_stock(-3, true, &[]), 0);
    }

    #[test]
    fn test_pick_featured_image() {
        let images = vec!["a.jpg".to_owned(), "b.jpg".to_owned()];
        assert_eq!(pick_featured_image(&images, Some(" b.jpg ")), Some("b.jpg".to_owned()));
        assert_eq!(pick_featured_image(&images, Some("c.jpg")), Some("a.jpg".to_owned()));
        assert_eq!(pick_featured_image(&images, None), Some("a.jpg".to_owned()));
        assert_eq!(pick_featured_image(&[], Some("a.jpg")), None);
    }

    #[test]
    fn test_variant_blob_shape() {
        let json = serde_json::to_value(variant("SKU", 2)).unwrap_or_default();
        assert_eq!(json["price"], serde_json::json!(99.9));
        assert_eq!(json["isDefault"], serde_json::json!(false));
        assert!(json.get("optionThree").is_none());
    }
}
