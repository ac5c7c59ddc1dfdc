//! Idempotent bootstrap data: default accounts, store settings and a sample
//! catalog.
//!
//! The catalog lives in `seed/catalog.yaml` and the storefront layout in
//! `seed/website_config.json`; both are embedded at compile time. Every step
//! only inserts what is missing, so seeding can run on every startup.
//!
//! ## YAML Format
//!
//! ```yaml
//! categories:
//!   - name: Yesil Zeytin
//!     slug: yesil-zeytin
//!     displayOrder: 3
//!     seoKeywords: [yesil zeytin]
//!
//! products:
//!   - name: Kirilmis Yesil Zeytin 900 gr
//!     slug: kirilmis-yesil-zeytin-900-gr
//!     sku: ERZ-YSZ-900G-006
//!     price: "239.90"
//!     stock: 59
//!     image: https://...
//!     categorySlug: yesil-zeytin
//! ```

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument};

use zeytin_core::catalog::PRODUCT_SLUG_FALLBACK;
use zeytin_core::slug::{slug_candidates, slugify};
use zeytin_core::validation::Violations;
use zeytin_core::{AdminRole, CategoryId};

use super::auth::{AuthError, hash_password, normalize_username};
use super::catalog::{CreateCategoryInput, CreateProductInput};
use crate::config::SeedCredentials;
use crate::db::admin_users::NewAdminUser;
use crate::db::{
    AdminUserRepository, CategoryRepository, ProductRepository, RepositoryError, settings,
};

const CATALOG_YAML: &str = include_str!("../../seed/catalog.yaml");
const WEBSITE_CONFIG_JSON: &str = include_str!("../../seed/website_config.json");

const ADMIN_FULL_NAME: &str = "Admin Kullanici";
const SAMPLE_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Errors raised while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),

    #[error("invalid website config: {0}")]
    WebsiteConfig(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("no free slug for {0}")]
    SlugExhausted(String),

    #[error("invalid sample product: {0}")]
    Product(#[from] Violations),
}

/// A sample category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: String,
    pub display_order: i32,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
}

impl SeedCategory {
    fn into_input(self) -> CreateCategoryInput {
        CreateCategoryInput {
            seo_title: Some(self.name.clone()),
            seo_description: Some(self.description.clone()),
            name: self.name,
            slug: Some(self.slug),
            description: Some(self.description),
            image_url: Some(self.image_url),
            display_order: Some(self.display_order),
            seo_keywords: Some(self.seo_keywords),
            is_active: Some(true),
        }
    }
}

/// A sample product with a single image and no variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub stock: i32,
    pub min_stock: i32,
    pub weight: Option<Decimal>,
    pub short_description: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: String,
    pub category_slug: String,
}

impl SeedProduct {
    /// Sample products are priced VAT-included at 10% with the default
    /// policy; the pricing summary is computed from cost and price.
    fn into_input(self) -> CreateProductInput {
        CreateProductInput {
            seo_title: Some(self.name.clone()),
            seo_description: Some(self.short_description.clone()),
            seo_keywords: Some(self.tags.clone()),
            featured_image: Some(self.image.clone()),
            name: self.name,
            slug: Some(self.slug),
            sku: self.sku,
            barcode: self.barcode,
            brand: self.brand,
            price: self.price,
            compare_at_price: self.compare_at_price,
            cost_price: self.cost_price,
            tax_rate: Some(SAMPLE_TAX_RATE),
            vat_included: Some(true),
            stock: self.stock,
            min_stock: Some(self.min_stock),
            weight: self.weight,
            width: None,
            height: None,
            length: None,
            short_description: Some(self.short_description),
            description: Some(self.description),
            tags: Some(self.tags),
            images: Some(vec![self.image]),
            has_variants: Some(false),
            variants: None,
            pricing_policy: None,
            expense_items: None,
            auto_price_from_policy: false,
            is_active: Some(true),
            category_id: None,
        }
    }
}

/// The embedded sample catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCatalog {
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
}

impl SeedCatalog {
    /// Parse the catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Catalog` if the YAML is malformed.
    pub fn embedded() -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(CATALOG_YAML)?)
    }
}

/// The default `websiteConfig` setting, compacted to a single line.
///
/// # Errors
///
/// Returns `SeedError::WebsiteConfig` if the embedded JSON is malformed.
pub fn default_website_config() -> Result<String, SeedError> {
    let value: serde_json::Value = serde_json::from_str(WEBSITE_CONFIG_JSON)?;
    Ok(value.to_string())
}

/// Setting defaults, in insertion order.
///
/// # Errors
///
/// Returns `SeedError::WebsiteConfig` if the embedded JSON is malformed.
pub fn default_settings() -> Result<Vec<(&'static str, String)>, SeedError> {
    Ok(vec![
        ("storeName", "Zeytin Commerce".to_owned()),
        ("supportEmail", "destek@zeytin.local".to_owned()),
        ("currency", "TRY".to_owned()),
        ("timezone", "Europe/Istanbul".to_owned()),
        ("taxRate", "20".to_owned()),
        ("websiteConfig", default_website_config()?),
    ])
}

/// What a seeding run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// The admin account was created.
    pub admin_created: bool,
    /// The representative account was created.
    pub representative_created: bool,
    /// Setting keys inserted.
    pub settings_inserted: usize,
    /// Categories inserted.
    pub categories_inserted: usize,
    /// Products inserted.
    pub products_inserted: usize,
    /// Products skipped because the sku already exists.
    pub products_skipped: usize,
}

/// Run every seeding step in order.
///
/// # Errors
///
/// Returns an error if the embedded data is malformed, a password cannot be
/// hashed, or a database operation fails.
#[instrument(skip_all, fields(admin = %credentials.admin_username))]
pub async fn seed_all(
    pool: &PgPool,
    credentials: &SeedCredentials,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport {
        admin_created: seed_admin(pool, credentials).await?,
        representative_created: seed_representative(pool, credentials).await?,
        ..SeedReport::default()
    };

    for (key, value) in default_settings()? {
        if settings::insert_if_missing(pool, key, &value).await? {
            report.settings_inserted += 1;
        }
    }

    seed_catalog(pool, SeedCatalog::embedded()?, &mut report).await?;

    info!(?report, "Seeding finished");
    Ok(report)
}

async fn seed_admin(pool: &PgPool, credentials: &SeedCredentials) -> Result<bool, SeedError> {
    let users = AdminUserRepository::new(pool);
    let username = normalize_username(&credentials.admin_username);

    if let Some(existing) = users.get_by_username(&username).await? {
        if existing.role != AdminRole::Admin
            || !existing.is_active
            || existing.full_name.is_empty()
        {
            users.promote_to_admin(existing.id, ADMIN_FULL_NAME).await?;
            info!(username = %username, "Existing user promoted to active admin");
        }
        return Ok(false);
    }

    let password_hash =
        hash_password(credentials.admin_password.expose_secret().to_owned()).await?;
    users
        .create(&NewAdminUser {
            username: &username,
            full_name: ADMIN_FULL_NAME,
            password_hash: &password_hash,
            role: AdminRole::Admin,
            is_active: true,
        })
        .await?;

    info!(username = %username, "Default admin created");
    Ok(true)
}

async fn seed_representative(
    pool: &PgPool,
    credentials: &SeedCredentials,
) -> Result<bool, SeedError> {
    let users = AdminUserRepository::new(pool);
    let username = normalize_username(&credentials.rep_username);

    if users.get_by_username(&username).await?.is_some() {
        return Ok(false);
    }

    let password_hash = hash_password(credentials.rep_password.expose_secret().to_owned()).await?;
    users
        .create(&NewAdminUser {
            username: &username,
            full_name: credentials.rep_full_name.trim(),
            password_hash: &password_hash,
            role: AdminRole::Representative,
            is_active: true,
        })
        .await?;

    info!(username = %username, "Default representative created");
    Ok(true)
}

async fn seed_catalog(
    pool: &PgPool,
    catalog: SeedCatalog,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    let categories = CategoryRepository::new(pool);
    let products = ProductRepository::new(pool);
    let now = Utc::now();

    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    for sample in catalog.categories {
        let slug = sample.slug.clone();
        let category = match categories.get_by_slug(&slug).await? {
            Some(existing) => existing,
            None => {
                report.categories_inserted += 1;
                categories
                    .insert(&sample.into_input().into_category(slug.clone(), now))
                    .await?
            }
        };
        category_ids.insert(slug, category.id);
    }

    for sample in catalog.products {
        if products.sku_taken(&sample.sku, None).await? {
            debug!(sku = %sample.sku, "Sample product exists, skipping");
            report.products_skipped += 1;
            continue;
        }

        let category_id = category_ids.get(&sample.category_slug).copied();
        let slug = unique_product_slug(&products, &sample.slug).await?;
        let product = sample.into_input().into_product(slug, category_id, now)?;
        products.insert(&product).await?;
        report.products_inserted += 1;
    }

    Ok(())
}

async fn unique_product_slug(
    products: &ProductRepository<'_>,
    source: &str,
) -> Result<String, SeedError> {
    let base = slugify(source, PRODUCT_SLUG_FALLBACK);
    for candidate in slug_candidates(&base) {
        if !products.slug_taken(&candidate, None).await? {
            return Ok(candidate);
        }
    }
    Err(SeedError::SlugExhausted(base))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_parse_embedded_catalog() {
        let catalog = SeedCatalog::embedded().unwrap();
        assert_eq!(catalog.categories.len(), 3);
        assert_eq!(catalog.products.len(), 7);

        let slugs: Vec<&str> = catalog.categories.iter().map(|c| c.slug.as_str()).collect();
        for product in &catalog.products {
            assert!(slugs.contains(&product.category_slug.as_str()), "{}", product.sku);
        }
    }

    #[test]
    fn test_sample_skus_are_unique() {
        let catalog = SeedCatalog::embedded().unwrap();
        let mut skus: Vec<&str> = catalog.products.iter().map(|p| p.sku.as_str()).collect();
        skus.sort_unstable();
        skus.dedup();
        assert_eq!(skus.len(), catalog.products.len());
    }

    #[test]
    fn test_sample_product_is_priced_from_cost() {
        let mut catalog = SeedCatalog::embedded().unwrap();
        let sample = catalog.products.remove(0);
        assert_eq!(sample.sku, "ERZ-ZYT-5LT-001");

        let product = sample.into_input().into_product(
            "erken-hasat".to_owned(),
            Some(CategoryId::generate()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(product.price, Decimal::from_str("1299.90").unwrap());
        assert_eq!(product.tax_rate, Decimal::TEN);
        assert!(product.vat_included);
        assert!(!product.has_variants);
        assert_eq!(product.stock, 36);
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.featured_image.as_deref(), product.images.first().map(String::as_str));
        assert_eq!(product.seo_keywords, product.tags);
        assert_eq!(product.pricing_summary.unit_cost, Decimal::from_str("899.00").unwrap());
        assert!(product.pricing_summary.estimated_profit > Decimal::ZERO);
    }

    #[test]
    fn test_sample_category_carries_seo_fields() {
        let mut catalog = SeedCatalog::embedded().unwrap();
        let category = catalog
            .categories
            .remove(0)
            .into_input()
            .into_category("sizma-zeytinyagi".to_owned(), Utc::now());
        assert_eq!(category.seo_title.as_deref(), Some("Sizma Zeytinyagi"));
        assert_eq!(category.seo_description, category.description);
        assert_eq!(category.display_order, 1);
        assert!(category.is_active);
    }

    #[test]
    fn test_default_settings() {
        let defaults = default_settings().unwrap();
        let keys: Vec<&str> = defaults.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec!["storeName", "supportEmail", "currency", "timezone", "taxRate", "websiteConfig"]
        );

        let config: serde_json::Value = serde_json::from_str(&defaults[5].1).unwrap();
        assert_eq!(config["theme"]["brandName"], "Er Zeytin");
        assert_eq!(config["navItems"].as_array().map(Vec::len), Some(5));
        assert!(!defaults[5].1.contains('\n'));
    }

    #[test]
    fn test_seed_report_default() {
        let report = SeedReport::default();
        assert!(!report.admin_created);
        assert_eq!(report.products_inserted, 0);
    }
}
