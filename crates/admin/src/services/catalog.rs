//! Catalog service: categories, products and the cached public views.
//!
//! Product writes run the same pipeline on create and update: normalize the
//! variants and derive the product stock from them, pick the featured image,
//! merge the pricing policy, then recompute the pricing summary at the final
//! sale price (the suggested price when `autoPriceFromPolicy` is set).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use sqlx::PgPool;

use zeytin_core::catalog::{
    CATEGORY_SLUG_FALLBACK, PRODUCT_SLUG_FALLBACK, ProductVariant, normalize_variants,
    pick_featured_image, resolve_product_stock,
};
use zeytin_core::money::{has_max_decimals, round2};
use zeytin_core::pricing::{
    ExpenseItem, PricingInput, PricingPolicy, PricingPolicyInput, calculate_summary,
    normalize_expense_items,
};
use zeytin_core::slug::{slug_candidates, slugify};
use zeytin_core::text::{normalize_string_list, to_nullable};
use zeytin_core::validation::{Violations, bounded_amount};
use zeytin_core::{CategoryId, ProductId};

use super::cache::AdminCache;
use super::realtime::{EventBus, EventName};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, CategoryWithProducts, Product, ProductWithCategory};

const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
/// `tax_rate` is a `NUMERIC(5,2)` column.
const MAX_TAX_RATE: Decimal = Decimal::from_parts(99_999, 0, 0, false, 2);

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn category_not_found() -> AppError {
    AppError::NotFound("category not found".to_owned())
}

fn product_not_found() -> AppError {
    AppError::NotFound("product not found".to_owned())
}

fn validate_category_id(v: &mut Violations, raw: Option<&str>) {
    if let Some(raw) = to_nullable(raw) {
        v.check(raw.parse::<CategoryId>().is_ok(), || {
            "categoryId must be a UUID".to_owned()
        });
    }
}

// ============================================================================
// Categories
// ============================================================================

/// `POST /api/catalog/categories` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl CreateCategoryInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("name", &self.name, 2);
        v.min_chars_opt("slug", self.slug.as_deref(), 2);
        if let Some(order) = self.display_order {
            v.check(order >= 0, || "displayOrder must not be less than 0".to_owned());
        }
        v
    }

    /// Build the category to insert under the already-unique `slug`.
    #[must_use]
    pub fn into_category(self, slug: String, now: DateTime<Utc>) -> Category {
        Category {
            id: CategoryId::generate(),
            name: self.name.trim().to_owned(),
            slug,
            description: to_nullable(self.description.as_deref()),
            image_url: to_nullable(self.image_url.as_deref()),
            display_order: self.display_order.unwrap_or(0),
            seo_title: to_nullable(self.seo_title.as_deref()),
            seo_description: to_nullable(self.seo_description.as_deref()),
            seo_keywords: normalize_string_list(self.seo_keywords.as_deref()),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }
}

/// `PATCH /api/catalog/categories/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateCategoryInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars_opt("name", self.name.as_deref(), 2);
        v.min_chars_opt("slug", self.slug.as_deref(), 2);
        if let Some(order) = self.display_order {
            v.check(order >= 0, || "displayOrder must not be less than 0".to_owned());
        }
        v
    }

    /// The value a new slug should be derived from, if any.
    #[must_use]
    pub fn slug_source(&self) -> Option<&str> {
        self.slug.as_deref().or(self.name.as_deref())
    }

    /// Apply every present field except the slug.
    pub fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name.trim().to_owned();
        }
        if let Some(description) = self.description {
            category.description = to_nullable(Some(description.as_str()));
        }
        if let Some(image_url) = self.image_url {
            category.image_url = to_nullable(Some(image_url.as_str()));
        }
        if let Some(order) = self.display_order {
            category.display_order = order;
        }
        if let Some(seo_title) = self.seo_title {
            category.seo_title = to_nullable(Some(seo_title.as_str()));
        }
        if let Some(seo_description) = self.seo_description {
            category.seo_description = to_nullable(Some(seo_description.as_str()));
        }
        if let Some(keywords) = self.seo_keywords {
            category.seo_keywords = normalize_string_list(Some(keywords.as_slice()));
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
    }
}

// ============================================================================
// Products
// ============================================================================

/// A variant as submitted by the admin UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub title: String,
    pub sku: String,
    pub price: Decimal,
    pub stock: i32,
    pub option_one: Option<String>,
    pub option_two: Option<String>,
    pub option_three: Option<String>,
    pub is_default: Option<bool>,
}

impl VariantInput {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("title", &self.title, 1);
        v.min_chars("sku", &self.sku, 1);
        v.non_negative_amount("price", self.price, 2);
        v.check(self.stock >= 0, || "stock must not be less than 0".to_owned());
        v
    }

    fn to_variant(&self) -> ProductVariant {
        ProductVariant {
            title: self.title.clone(),
            sku: self.sku.clone(),
            price: round2(self.price),
            stock: self.stock,
            option_one: self.option_one.clone(),
            option_two: self.option_two.clone(),
            option_three: self.option_three.clone(),
            is_default: self.is_default.unwrap_or(false),
        }
    }
}

/// An expense line as submitted by the admin UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemInput {
    pub name: String,
    pub amount: Decimal,
}

fn normalize_variant_inputs(inputs: &[VariantInput]) -> Vec<ProductVariant> {
    let variants: Vec<ProductVariant> = inputs.iter().map(VariantInput::to_variant).collect();
    normalize_variants(&variants)
}

fn normalize_expense_inputs(inputs: &[ExpenseItemInput]) -> Vec<ExpenseItem> {
    let items: Vec<ExpenseItem> = inputs
        .iter()
        .map(|item| ExpenseItem {
            name: item.name.clone(),
            amount: item.amount,
        })
        .collect();
    normalize_expense_items(&items)
}

fn validate_variants(v: &mut Violations, variants: Option<&[VariantInput]>) {
    for (index, variant) in variants.unwrap_or_default().iter().enumerate() {
        v.extend_prefixed(&format!("variants.{index}"), variant.validate());
    }
}

fn validate_expense_items(v: &mut Violations, items: Option<&[ExpenseItemInput]>) {
    for (index, item) in items.unwrap_or_default().iter().enumerate() {
        let field = format!("expenseItems.{index}");
        v.min_chars(&format!("{field}.name"), &item.name, 2);
        v.non_negative_amount(&format!("{field}.amount"), item.amount, 2);
    }
}

fn validate_policy(v: &mut Violations, policy: Option<&PricingPolicyInput>) {
    if let Some(policy) = policy {
        for (name, value) in policy.provided() {
            v.non_negative_amount(&format!("pricingPolicy.{name}"), value, 2);
        }
    }
}

fn validate_dimension(v: &mut Violations, field: &str, value: Option<Decimal>, places: u32) {
    if let Some(value) = value {
        v.non_negative_amount(field, value, places);
    }
}

fn validate_tax_rate(v: &mut Violations, value: Option<Decimal>) {
    if let Some(value) = value {
        v.check(value >= Decimal::ZERO, || {
            "taxRate must not be less than 0".to_owned()
        });
        v.at_most("taxRate", value, MAX_TAX_RATE);
        v.check(has_max_decimals(value, 2), || {
            "taxRate must have at most 2 decimal places".to_owned()
        });
    }
}

/// `POST /api/catalog/products` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub vat_included: Option<bool>,
    #[serde(default)]
    pub stock: i32,
    pub min_stock: Option<i32>,
    pub weight: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub length: Option<Decimal>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub has_variants: Option<bool>,
    pub variants: Option<Vec<VariantInput>>,
    pub pricing_policy: Option<PricingPolicyInput>,
    pub expense_items: Option<Vec<ExpenseItemInput>>,
    #[serde(default)]
    pub auto_price_from_policy: bool,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub category_id: Option<String>,
}

impl CreateProductInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars("name", &self.name, 2);
        v.min_chars_opt("slug", self.slug.as_deref(), 2);
        v.min_chars("sku", &self.sku, 2);
        v.non_negative_amount("price", self.price, 2);
        validate_dimension(&mut v, "compareAtPrice", self.compare_at_price, 2);
        validate_dimension(&mut v, "costPrice", self.cost_price, 2);
        validate_tax_rate(&mut v, self.tax_rate);
        v.check(self.stock >= 0, || "stock must not be less than 0".to_owned());
        if let Some(min_stock) = self.min_stock {
            v.check(min_stock >= 0, || "minStock must not be less than 0".to_owned());
        }
        validate_dimension(&mut v, "weight", self.weight, 3);
        validate_dimension(&mut v, "width", self.width, 2);
        validate_dimension(&mut v, "height", self.height, 2);
        validate_dimension(&mut v, "length", self.length, 2);
        validate_variants(&mut v, self.variants.as_deref());
        validate_policy(&mut v, self.pricing_policy.as_ref());
        validate_expense_items(&mut v, self.expense_items.as_deref());
        validate_category_id(&mut v, self.category_id.as_deref());
        v
    }

    /// Build the product to insert. `slug` must already be unique and
    /// `category_id` already resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] when the pricing summary cannot be computed.
    pub fn into_product(
        self,
        slug: String,
        category_id: Option<CategoryId>,
        now: DateTime<Utc>,
    ) -> std::result::Result<Product, Violations> {
        let variants = normalize_variant_inputs(self.variants.as_deref().unwrap_or_default());
        let has_variants = self.has_variants.unwrap_or(!variants.is_empty());
        let variants = if has_variants { variants } else { Vec::new() };
        let stock = resolve_product_stock(self.stock, has_variants, &variants);
        let images = normalize_string_list(self.images.as_deref());
        let featured_image = pick_featured_image(&images, self.featured_image.as_deref());

        let mut product = Product {
            id: ProductId::generate(),
            name: self.name.trim().to_owned(),
            slug: Some(slug),
            sku: self.sku.trim().to_owned(),
            barcode: to_nullable(self.barcode.as_deref()),
            brand: to_nullable(self.brand.as_deref()),
            price: Decimal::ZERO,
            compare_at_price: self.compare_at_price.map(round2),
            cost_price: self.cost_price.map(round2),
            tax_rate: self.tax_rate.map_or(DEFAULT_TAX_RATE, round2),
            vat_included: self.vat_included.unwrap_or(true),
            stock,
            min_stock: self.min_stock.unwrap_or(0),
            weight: self.weight,
            width: self.width,
            height: self.height,
            length: self.length,
            short_description: to_nullable(self.short_description.as_deref()),
            description: to_nullable(self.description.as_deref()),
            tags: normalize_string_list(self.tags.as_deref()),
            images,
            featured_image,
            has_variants,
            variants,
            pricing_policy: PricingPolicy::normalize(self.pricing_policy.as_ref(), None),
            expense_items: normalize_expense_inputs(
                self.expense_items.as_deref().unwrap_or_default(),
            ),
            pricing_summary: Default::default(),
            seo_title: to_nullable(self.seo_title.as_deref()),
            seo_description: to_nullable(self.seo_description.as_deref()),
            seo_keywords: normalize_string_list(self.seo_keywords.as_deref()),
            is_active: self.is_active.unwrap_or(true),
            category_id,
            created_at: now,
            updated_at: now,
        };
        reprice(&mut product, self.price, self.auto_price_from_policy)?;
        Ok(product)
    }
}

/// `PATCH /api/catalog/products/{id}` body.
///
/// Nullable numeric fields are double options: absent leaves the value alone,
/// `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub compare_at_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cost_price: Option<Option<Decimal>>,
    pub tax_rate: Option<Decimal>,
    pub vat_included: Option<bool>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub weight: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub width: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub height: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub length: Option<Option<Decimal>>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub has_variants: Option<bool>,
    pub variants: Option<Vec<VariantInput>>,
    pub pricing_policy: Option<PricingPolicyInput>,
    pub expense_items: Option<Vec<ExpenseItemInput>>,
    #[serde(default)]
    pub auto_price_from_policy: bool,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub category_id: Option<String>,
}

impl UpdateProductInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.min_chars_opt("name", self.name.as_deref(), 2);
        v.min_chars_opt("slug", self.slug.as_deref(), 2);
        v.min_chars_opt("sku", self.sku.as_deref(), 2);
        validate_dimension(&mut v, "price", self.price, 2);
        validate_dimension(&mut v, "compareAtPrice", self.compare_at_price.flatten(), 2);
        validate_dimension(&mut v, "costPrice", self.cost_price.flatten(), 2);
        validate_tax_rate(&mut v, self.tax_rate);
        if let Some(stock) = self.stock {
            v.check(stock >= 0, || "stock must not be less than 0".to_owned());
        }
        if let Some(min_stock) = self.min_stock {
            v.check(min_stock >= 0, || "minStock must not be less than 0".to_owned());
        }
        validate_dimension(&mut v, "weight", self.weight.flatten(), 3);
        validate_dimension(&mut v, "width", self.width.flatten(), 2);
        validate_dimension(&mut v, "height", self.height.flatten(), 2);
        validate_dimension(&mut v, "length", self.length.flatten(), 2);
        validate_variants(&mut v, self.variants.as_deref());
        validate_policy(&mut v, self.pricing_policy.as_ref());
        validate_expense_items(&mut v, self.expense_items.as_deref());
        validate_category_id(&mut v, self.category_id.as_deref());
        v
    }

    /// The value a new slug should be derived from, if any.
    #[must_use]
    pub fn slug_source(&self) -> Option<&str> {
        self.slug.as_deref().or(self.name.as_deref())
    }

    /// Apply every present field except slug and category, then re-resolve
    /// stock and recompute pricing.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] when the pricing summary cannot be computed.
    pub fn apply(self, product: &mut Product) -> std::result::Result<(), Violations> {
        if let Some(name) = self.name {
            product.name = name.trim().to_owned();
        }
        if let Some(sku) = self.sku {
            product.sku = sku.trim().to_owned();
        }
        if let Some(barcode) = self.barcode {
            product.barcode = to_nullable(Some(barcode.as_str()));
        }
        if let Some(brand) = self.brand {
            product.brand = to_nullable(Some(brand.as_str()));
        }
        if let Some(compare_at_price) = self.compare_at_price {
            product.compare_at_price = compare_at_price.map(round2);
        }
        if let Some(cost_price) = self.cost_price {
            product.cost_price = cost_price.map(round2);
        }
        if let Some(tax_rate) = self.tax_rate {
            product.tax_rate = round2(tax_rate);
        }
        if let Some(vat_included) = self.vat_included {
            product.vat_included = vat_included;
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(weight) = self.weight {
            product.weight = weight;
        }
        if let Some(width) = self.width {
            product.width = width;
        }
        if let Some(height) = self.height {
            product.height = height;
        }
        if let Some(length) = self.length {
            product.length = length;
        }
        if let Some(short_description) = self.short_description {
            product.short_description = to_nullable(Some(short_description.as_str()));
        }
        if let Some(description) = self.description {
            product.description = to_nullable(Some(description.as_str()));
        }
        if let Some(tags) = self.tags {
            product.tags = normalize_string_list(Some(tags.as_slice()));
        }

        let images_changed = self.images.is_some();
        if let Some(images) = self.images {
            product.images = normalize_string_list(Some(images.as_slice()));
        }
        if images_changed || self.featured_image.is_some() {
            let preferred = self.featured_image.or_else(|| product.featured_image.take());
            product.featured_image = pick_featured_image(&product.images, preferred.as_deref());
        }

        if let Some(variants) = self.variants {
            product.variants = normalize_variant_inputs(&variants);
            if self.has_variants.is_none() {
                product.has_variants = !product.variants.is_empty();
            }
        }
        if let Some(has_variants) = self.has_variants {
            product.has_variants = has_variants;
            if !has_variants {
                product.variants.clear();
            }
        }
        let fallback_stock = self.stock.unwrap_or(product.stock);
        product.stock = resolve_product_stock(fallback_stock, product.has_variants, &product.variants);

        if let Some(seo_title) = self.seo_title {
            product.seo_title = to_nullable(Some(seo_title.as_str()));
        }
        if let Some(seo_description) = self.seo_description {
            product.seo_description = to_nullable(Some(seo_description.as_str()));
        }
        if let Some(keywords) = self.seo_keywords {
            product.seo_keywords = normalize_string_list(Some(keywords.as_slice()));
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }

        product.pricing_policy =
            PricingPolicy::normalize(self.pricing_policy.as_ref(), Some(&product.pricing_policy));
        product.expense_items = match self.expense_items {
            Some(items) => normalize_expense_inputs(&items),
            None => normalize_expense_items(&product.expense_items),
        };

        let requested_price = self.price.unwrap_or(product.price);
        reprice(product, requested_price, self.auto_price_from_policy)
    }
}

/// Recompute the pricing summary. With `auto_price` the sale price becomes
/// the suggested sale price and the summary is evaluated at that price.
///
/// # Errors
///
/// Returns [`Violations`] when the summary overflows or the suggested price
/// does not fit the price column.
pub fn reprice(
    product: &mut Product,
    requested_price: Decimal,
    auto_price: bool,
) -> std::result::Result<(), Violations> {
    let summary_at = |sale_price: Decimal| {
        calculate_summary(&PricingInput {
            cost_price: product.cost_price.unwrap_or(Decimal::ZERO),
            tax_rate: product.tax_rate,
            vat_included: product.vat_included,
            policy: &product.pricing_policy,
            expense_items: &product.expense_items,
            current_sale_price: sale_price,
        })
    };

    let price = if auto_price {
        summary_at(requested_price)?.suggested_sale_price
    } else {
        requested_price
    };
    let price = bounded_amount("price", Some(round2(price)))?;
    let summary = summary_at(price)?;

    product.price = price;
    product.pricing_summary = summary;
    Ok(())
}

/// Embed each product's category.
#[must_use]
pub fn attach_categories(
    products: Vec<Product>,
    categories: &[Category],
) -> Vec<ProductWithCategory> {
    let by_id: HashMap<CategoryId, &Category> =
        categories.iter().map(|category| (category.id, category)).collect();

    products
        .into_iter()
        .map(|product| {
            let category = product
                .category_id
                .and_then(|id| by_id.get(&id))
                .map(|category| (*category).clone());
            ProductWithCategory { product, category }
        })
        .collect()
}

/// Group products under their categories. Uncategorized products are left
/// out; product order is preserved within each category.
#[must_use]
pub fn group_products(
    categories: Vec<Category>,
    products: Vec<Product>,
) -> Vec<CategoryWithProducts> {
    let mut by_category: HashMap<CategoryId, Vec<Product>> = HashMap::new();
    for product in products {
        if let Some(category_id) = product.category_id {
            by_category.entry(category_id).or_default().push(product);
        }
    }

    categories
        .into_iter()
        .map(|category| {
            let products = by_category.remove(&category.id).unwrap_or_default();
            CategoryWithProducts { category, products }
        })
        .collect()
}

// ============================================================================
// Service
// ============================================================================

/// Catalog service.
pub struct CatalogService<'a> {
    categories: CategoryRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a AdminCache,
    events: &'a EventBus,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a AdminCache, events: &'a EventBus) -> Self {
        Self {
            categories: CategoryRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
            events,
        }
    }

    /// Active categories, served from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn public_categories(&self) -> Result<Arc<Vec<Category>>> {
        if let Some(cached) = self.cache.public_categories().await {
            return Ok(cached);
        }

        let categories = Arc::new(self.categories.list(true).await?);
        self.cache.set_public_categories(Arc::clone(&categories)).await;
        Ok(categories)
    }

    /// Active products in active (or no) categories, served from cache when
    /// possible.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn public_products(&self) -> Result<Arc<Vec<ProductWithCategory>>> {
        if let Some(cached) = self.cache.public_products().await {
            return Ok(cached);
        }

        let products = self.products.list(true).await?;
        let categories = self.categories.list(true).await?;
        let products = Arc::new(attach_categories(products, &categories));
        self.cache.set_public_products(Arc::clone(&products)).await;
        Ok(products)
    }

    /// Every category with its products.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn categories_with_products(&self) -> Result<Vec<CategoryWithProducts>> {
        let categories = self.categories.list(false).await?;
        let products = self.products.list(false).await?;
        Ok(group_products(categories, products))
    }

    /// Every product with its category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn products_with_category(&self) -> Result<Vec<ProductWithCategory>> {
        let products = self.products.list(false).await?;
        let categories = self.categories.list(false).await?;
        Ok(attach_categories(products, &categories))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::Database` if a query fails.
    pub async fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        input.validate().into_result()?;

        let source = input.slug.clone().unwrap_or_else(|| input.name.clone());
        let slug = self.unique_category_slug(&source, None).await?;
        let category = self.categories.insert(&input.into_category(slug, Utc::now())).await?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        self.cache.invalidate_catalog().await;
        self.events
            .publish(EventName::CategoryCreated, json!({ "category": category }))
            .await;
        Ok(category)
    }

    /// Apply a partial update to a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::NotFound` if the category does not exist.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> Result<Category> {
        input.validate().into_result()?;

        let mut category = self
            .categories
            .get_by_id(id)
            .await?
            .ok_or_else(category_not_found)?;

        if let Some(source) = input.slug_source() {
            category.slug = self.unique_category_slug(source, Some(id)).await?;
        }
        input.apply(&mut category);

        let category = self.categories.update(&category).await?;

        self.cache.invalidate_catalog().await;
        self.events
            .publish(EventName::CategoryUpdated, json!({ "category": category }))
            .await;
        Ok(category)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::Conflict` if the sku or barcode is taken.
    /// Returns `AppError::NotFound` if `categoryId` does not exist.
    pub async fn create_product(&self, input: CreateProductInput) -> Result<ProductWithCategory> {
        input.validate().into_result()?;

        let sku = input.sku.trim();
        if self.products.sku_taken(sku, None).await? {
            return Err(AppError::Conflict("sku already exists".to_owned()));
        }
        if let Some(barcode) = to_nullable(input.barcode.as_deref())
            && self.products.barcode_taken(&barcode, None).await?
        {
            return Err(AppError::Conflict("barcode already exists".to_owned()));
        }

        let category = self.resolve_category(input.category_id.as_deref()).await?;
        let source = input.slug.clone().unwrap_or_else(|| input.name.clone());
        let slug = self.unique_product_slug(&source, None).await?;

        let product = input.into_product(slug, category.as_ref().map(|c| c.id), Utc::now())?;
        let product = self.products.insert(&product).await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        let saved = ProductWithCategory { product, category };
        self.cache.invalidate_catalog().await;
        self.events
            .publish(EventName::ProductCreated, json!({ "product": saved }))
            .await;
        Ok(saved)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::NotFound` if the product or category does not exist.
    /// Returns `AppError::Conflict` if a changed sku or barcode is taken.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: UpdateProductInput,
    ) -> Result<ProductWithCategory> {
        input.validate().into_result()?;

        let mut product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or_else(product_not_found)?;

        if let Some(sku) = input.sku.as_deref().map(str::trim)
            && sku != product.sku
            && self.products.sku_taken(sku, Some(id)).await?
        {
            return Err(AppError::Conflict("sku already exists".to_owned()));
        }
        if let Some(barcode) = to_nullable(input.barcode.as_deref())
            && product.barcode.as_deref() != Some(barcode.as_str())
            && self.products.barcode_taken(&barcode, Some(id)).await?
        {
            return Err(AppError::Conflict("barcode already exists".to_owned()));
        }

        let category = match input.category_id.as_deref() {
            Some(raw) => self.resolve_category(Some(raw)).await?,
            None => match product.category_id {
                Some(category_id) => self.categories.get_by_id(category_id).await?,
                None => None,
            },
        };

        if let Some(source) = input.slug_source() {
            product.slug = Some(self.unique_product_slug(source, Some(id)).await?);
        }
        product.category_id = category.as_ref().map(|c| c.id);
        input.apply(&mut product)?;

        let product = self.products.update(&product).await?;

        let saved = ProductWithCategory { product, category };
        self.cache.invalidate_catalog().await;
        self.events
            .publish(EventName::ProductUpdated, json!({ "product": saved }))
            .await;
        Ok(saved)
    }

    /// `None` for a blank id, 404 for an unknown one.
    async fn resolve_category(&self, raw: Option<&str>) -> Result<Option<Category>> {
        let Some(raw) = to_nullable(raw) else {
            return Ok(None);
        };
        let id: CategoryId = raw
            .parse()
            .map_err(|_| AppError::BadRequest("categoryId must be a UUID".to_owned()))?;
        let category = self
            .categories
            .get_by_id(id)
            .await?
            .ok_or_else(category_not_found)?;
        Ok(Some(category))
    }

    async fn unique_category_slug(
        &self,
        source: &str,
        exclude: Option<CategoryId>,
    ) -> Result<String> {
        let base = slugify(source, CATEGORY_SLUG_FALLBACK);
        for candidate in slug_candidates(&base) {
            if !self.categories.slug_taken(&candidate, exclude).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(format!("no free slug for {base}")))
    }

    async fn unique_product_slug(
        &self,
        source: &str,
        exclude: Option<ProductId>,
    ) -> Result<String> {
        let base = slugify(source, PRODUCT_SLUG_FALLBACK);
        for candidate in slug_candidates(&base) {
            if !self.products.slug_taken(&candidate, exclude).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(format!("no free slug for {base}")))
    }
}
