//! Integration tests for the embedded sample data.
//!
//! The seed files ship inside the admin binary, so a bad edit only shows up
//! on first startup. These tests catch it at build time instead.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;

use zeytin_admin::services::seed::{SeedCatalog, default_settings};
use zeytin_admin::services::settings::{PUBLIC_SETTING_KEYS, UpdateSettingsInput, public_subset};
use zeytin_core::catalog::{CATEGORY_SLUG_FALLBACK, PRODUCT_SLUG_FALLBACK};
use zeytin_core::slug::slugify;

#[test]
fn test_seed_slugs_are_canonical() {
    let catalog = SeedCatalog::embedded().unwrap();

    for category in &catalog.categories {
        assert_eq!(
            slugify(&category.slug, CATEGORY_SLUG_FALLBACK),
            category.slug,
            "category slug {} is not canonical",
            category.slug
        );
    }
    for product in &catalog.products {
        assert_eq!(
            slugify(&product.slug, PRODUCT_SLUG_FALLBACK),
            product.slug,
            "product slug {} is not canonical",
            product.slug
        );
    }
}

#[test]
fn test_seed_slugs_are_unique() {
    let catalog = SeedCatalog::embedded().unwrap();

    let categories: HashSet<_> = catalog.categories.iter().map(|c| &c.slug).collect();
    assert_eq!(categories.len(), catalog.categories.len());

    let products: HashSet<_> = catalog.products.iter().map(|p| &p.slug).collect();
    assert_eq!(products.len(), catalog.products.len());
}

#[test]
fn test_seed_products_are_sellable() {
    let catalog = SeedCatalog::embedded().unwrap();

    for product in &catalog.products {
        assert!(product.price > Decimal::ZERO, "{} has no price", product.sku);
        assert!(product.stock >= product.min_stock, "{} starts below minimum", product.sku);
        if let Some(cost) = product.cost_price {
            assert!(cost < product.price, "{} sells below cost", product.sku);
        }
        if let Some(compare_at) = product.compare_at_price {
            assert!(compare_at > product.price, "{} has no discount", product.sku);
        }
    }
}

#[test]
fn test_default_settings_are_public_and_valid() {
    let defaults: BTreeMap<String, String> = default_settings()
        .unwrap()
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect();

    assert_eq!(public_subset(&defaults), defaults);
    assert_eq!(defaults.len(), PUBLIC_SETTING_KEYS.len());

    let input = UpdateSettingsInput {
        store_name: defaults.get("storeName").cloned(),
        support_email: defaults.get("supportEmail").cloned(),
        currency: defaults.get("currency").cloned(),
        timezone: defaults.get("timezone").cloned(),
        tax_rate: defaults
            .get("taxRate")
            .map(|rate| Decimal::from_str(rate).unwrap()),
        website_config: defaults.get("websiteConfig").cloned(),
    };
    assert!(input.validate().is_empty());

    let config: serde_json::Value =
        serde_json::from_str(&defaults["websiteConfig"]).unwrap();
    assert_eq!(config["theme"]["brandName"], "Er Zeytin");
}
