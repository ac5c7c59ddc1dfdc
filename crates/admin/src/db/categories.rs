//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use zeytin_core::CategoryId;

use super::{RepositoryError, decode_json, encode_json};
use crate::models::Category;

/// Internal row type for category queries.
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    image_url: Option<String>,
    display_order: i32,
    seo_title: Option<String>,
    seo_description: Option<String>,
    seo_keywords: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            image_url: row.image_url,
            display_order: row.display_order,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            seo_keywords: decode_json("seo_keywords", row.seo_keywords)?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories in display order, optionally only the active ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, description, image_url, display_order,
                   seo_title, seo_description, seo_keywords, is_active,
                   created_at, updated_at
            FROM categories
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY display_order ASC, created_at DESC
            ",
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, description, image_url, display_order,
                   seo_title, seo_description, seo_keywords, is_active,
                   created_at, updated_at
            FROM categories
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a JSONB column is malformed.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, description, image_url, display_order,
                   seo_title, seo_description, seo_keywords, is_active,
                   created_at, updated_at
            FROM categories
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether `slug` belongs to a category other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_taken(
        &self,
        slug: &str,
        exclude: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM categories
                WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            ",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    /// Insert a category. The ID comes from `category.id`; timestamps are set
    /// by the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, category: &Category) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (
                id, name, slug, description, image_url, display_order,
                seo_title, seo_description, seo_keywords, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, slug, description, image_url, display_order,
                      seo_title, seo_description, seo_keywords, is_active,
                      created_at, updated_at
            ",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.description.as_deref())
        .bind(category.image_url.as_deref())
        .bind(category.display_order)
        .bind(category.seo_title.as_deref())
        .bind(category.seo_description.as_deref())
        .bind(encode_json("seo_keywords", &category.seo_keywords)?)
        .bind(category.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "category slug already exists"))?;

        row.try_into()
    }

    /// Overwrite every editable column of an existing category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, category: &Category) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories
            SET name = $2,
                slug = $3,
                description = $4,
                image_url = $5,
                display_order = $6,
                seo_title = $7,
                seo_description = $8,
                seo_keywords = $9,
                is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, description, image_url, display_order,
                      seo_title, seo_description, seo_keywords, is_active,
                      created_at, updated_at
            ",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.description.as_deref())
        .bind(category.image_url.as_deref())
        .bind(category.display_order)
        .bind(category.seo_title.as_deref())
        .bind(category.seo_description.as_deref())
        .bind(encode_json("seo_keywords", &category.seo_keywords)?)
        .bind(category.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "category slug already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
