//! Product repository.
//!
//! Variants, pricing policy, expense items and the pricing summary live in
//! JSONB columns. The `lock_*` helpers run on a caller-owned transaction and
//! take `FOR UPDATE` row locks so concurrent orders cannot oversell.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use zeytin_core::catalog::ProductVariant;
use zeytin_core::{CategoryId, ProductId};

use super::{RepositoryError, decode_json, encode_json};
use crate::models::Product;

/// Column list shared by every product query.
const PRODUCT_COLUMNS: &str = r"
    p.id, p.name, p.slug, p.sku, p.barcode, p.brand, p.price, p.compare_at_price,
    p.cost_price, p.tax_rate, p.vat_included, p.stock, p.min_stock, p.weight,
    p.width, p.height, p.length, p.short_description, p.description, p.tags,
    p.images, p.featured_image, p.has_variants, p.variants, p.pricing_policy,
    p.expense_items, p.pricing_summary, p.seo_title, p.seo_description,
    p.seo_keywords, p.is_active, p.category_id, p.created_at, p.updated_at
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: Option<String>,
    sku: String,
    barcode: Option<String>,
    brand: Option<String>,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    cost_price: Option<Decimal>,
    tax_rate: Decimal,
    vat_included: bool,
    stock: i32,
    min_stock: i32,
    weight: Option<Decimal>,
    width: Option<Decimal>,
    height: Option<Decimal>,
    length: Option<Decimal>,
    short_description: Option<String>,
    description: Option<String>,
    tags: serde_json::Value,
    images: serde_json::Value,
    featured_image: Option<String>,
    has_variants: bool,
    variants: serde_json::Value,
    pricing_policy: serde_json::Value,
    expense_items: serde_json::Value,
    pricing_summary: serde_json::Value,
    seo_title: Option<String>,
    seo_description: Option<String>,
    seo_keywords: serde_json::Value,
    is_active: bool,
    category_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            sku: row.sku,
            barcode: row.barcode,
            brand: row.brand,
            price: row.price,
            compare_at_price: row.compare_at_price,
            cost_price: row.cost_price,
            tax_rate: row.tax_rate,
            vat_included: row.vat_included,
            stock: row.stock,
            min_stock: row.min_stock,
            weight: row.weight,
            width: row.width,
            height: row.height,
            length: row.length,
            short_description: row.short_description,
            description: row.description,
            tags: decode_json("tags", row.tags)?,
            images: decode_json("images", row.images)?,
            featured_image: row.featured_image,
            has_variants: row.has_variants,
            variants: decode_json("variants", row.variants)?,
            pricing_policy: decode_json("pricing_policy", row.pricing_policy)?,
            expense_items: decode_json("expense_items", row.expense_items)?,
            pricing_summary: decode_json("pricing_summary", row.pricing_summary)?,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            seo_keywords: decode_json("seo_keywords", row.seo_keywords)?,
            is_active: row.is_active,
            category_id: row.category_id.map(CategoryId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// JSONB payloads of a product, encoded once per write.
struct ProductJson {
    tags: serde_json::Value,
    images: serde_json::Value,
    variants: serde_json::Value,
    pricing_policy: serde_json::Value,
    expense_items: serde_json::Value,
    pricing_summary: serde_json::Value,
    seo_keywords: serde_json::Value,
}

impl ProductJson {
    fn encode(product: &Product) -> Result<Self, RepositoryError> {
        Ok(Self {
            tags: encode_json("tags", &product.tags)?,
            images: encode_json("images", &product.images)?,
            variants: encode_json("variants", &product.variants)?,
            pricing_policy: encode_json("pricing_policy", &product.pricing_policy)?,
            expense_items: encode_json("expense_items", &product.expense_items)?,
            pricing_summary: encode_json("pricing_summary", &product.pricing_summary)?,
            seo_keywords: encode_json("seo_keywords", &product.seo_keywords)?,
        })
    }
}

/// Map a unique violation to a conflict naming the offending column.
fn product_conflict(err: sqlx::Error) -> RepositoryError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(ToOwned::to_owned),
        _ => None,
    };
    let message = match constraint.as_deref() {
        Some(c) if c.contains("barcode") => "barcode already exists",
        Some(c) if c.contains("slug") => "product slug already exists",
        _ => "sku already exists",
    };
    RepositoryError::conflict_on_unique(err, message)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first.
    ///
    /// With `active_only` the list is restricted to active products whose
    /// category is unset or active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE ($1 = FALSE OR (p.is_active = TRUE AND (c.id IS NULL OR c.is_active = TRUE)))
            ORDER BY p.created_at DESC
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(active_only)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether `sku` belongs to a product other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sku_taken(
        &self,
        sku: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        self.column_taken("sku", sku, exclude).await
    }

    /// Whether `barcode` belongs to a product other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn barcode_taken(
        &self,
        barcode: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        self.column_taken("barcode", barcode, exclude).await
    }

    /// Whether `slug` belongs to a product other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_taken(
        &self,
        slug: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        self.column_taken("slug", slug, exclude).await
    }

    // `column` is always one of the literals above.
    async fn column_taken(
        &self,
        column: &'static str,
        value: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            r"
            SELECT EXISTS (
                SELECT 1 FROM products
                WHERE {column} = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude)
            .fetch_one(self.pool)
            .await?;

        Ok(taken)
    }

    /// Insert a product. The ID comes from `product.id`; timestamps are set by
    /// the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate sku, barcode or slug.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, product: &Product) -> Result<Product, RepositoryError> {
        let json = ProductJson::encode(product)?;
        let sql = format!(
            r"
            WITH p AS (
                INSERT INTO products (
                    id, name, slug, sku, barcode, brand, price, compare_at_price,
                    cost_price, tax_rate, vat_included, stock, min_stock, weight,
                    width, height, length, short_description, description, tags,
                    images, featured_image, has_variants, variants, pricing_policy,
                    expense_items, pricing_summary, seo_title, seo_description,
                    seo_keywords, is_active, category_id
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                    $27, $28, $29, $30, $31, $32
                )
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p
            "
        );
        let row = bind_product(sqlx::query_as::<_, ProductRow>(&sql), product, json)
            .fetch_one(self.pool)
            .await
            .map_err(product_conflict)?;

        row.try_into()
    }

    /// Overwrite every editable column of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` on a duplicate sku, barcode or slug.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, product: &Product) -> Result<Product, RepositoryError> {
        let json = ProductJson::encode(product)?;
        let sql = format!(
            r"
            WITH p AS (
                UPDATE products
                SET name = $2, slug = $3, sku = $4, barcode = $5, brand = $6,
                    price = $7, compare_at_price = $8, cost_price = $9,
                    tax_rate = $10, vat_included = $11, stock = $12,
                    min_stock = $13, weight = $14, width = $15, height = $16,
                    length = $17, short_description = $18, description = $19,
                    tags = $20, images = $21, featured_image = $22,
                    has_variants = $23, variants = $24, pricing_policy = $25,
                    expense_items = $26, pricing_summary = $27, seo_title = $28,
                    seo_description = $29, seo_keywords = $30, is_active = $31,
                    category_id = $32, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p
            "
        );
        let row = bind_product(sqlx::query_as::<_, ProductRow>(&sql), product, json)
            .fetch_optional(self.pool)
            .await
            .map_err(product_conflict)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    // =========================================================================
    // Transactional stock helpers
    // =========================================================================

    /// Lock a product row by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Lock a product row by its own SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_sku(
        conn: &mut PgConnection,
        sku: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.sku = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(sku)
            .fetch_optional(conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Lock the product owning a variant with `sku`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_variant_sku(
        conn: &mut PgConnection,
        sku: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(p.variants) v
                WHERE v->>'sku' = $1
            )
            LIMIT 1
            FOR UPDATE
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(sku)
            .fetch_optional(conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Persist new stock figures for a locked product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_stock(
        conn: &mut PgConnection,
        id: ProductId,
        stock: i32,
        variants: &[ProductVariant],
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET stock = $2, variants = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(stock)
        .bind(encode_json("variants", &variants)?)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Bind the 32 product parameters in column order.
fn bind_product<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, ProductRow, sqlx::postgres::PgArguments>,
    product: &'q Product,
    json: ProductJson,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, ProductRow, sqlx::postgres::PgArguments> {
    query
        .bind(product.id)
        .bind(&product.name)
        .bind(product.slug.as_deref())
        .bind(&product.sku)
        .bind(product.barcode.as_deref())
        .bind(product.brand.as_deref())
        .bind(product.price)
        .bind(product.compare_at_price)
        .bind(product.cost_price)
        .bind(product.tax_rate)
        .bind(product.vat_included)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.weight)
        .bind(product.width)
        .bind(product.height)
        .bind(product.length)
        .bind(product.short_description.as_deref())
        .bind(product.description.as_deref())
        .bind(json.tags)
        .bind(json.images)
        .bind(product.featured_image.as_deref())
        .bind(product.has_variants)
        .bind(json.variants)
        .bind(json.pricing_policy)
        .bind(json.expense_items)
        .bind(json.pricing_summary)
        .bind(product.seo_title.as_deref())
        .bind(product.seo_description.as_deref())
        .bind(json.seo_keywords)
        .bind(product.is_active)
        .bind(product.category_id)
}
