//! In-memory cache for the public read endpoints.
//!
//! Public settings and the public catalog lists are hit by every storefront
//! page load. They are cached for 5 minutes and invalidated on every write
//! to the backing tables.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::models::{Category, ProductWithCategory};

/// Cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PublicSettings,
    PublicCategories,
    PublicProducts,
}

/// Cached values.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Settings(Arc<BTreeMap<String, String>>),
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<ProductWithCategory>>),
}

/// Shared cache handle; clones share storage.
#[derive(Clone)]
pub struct AdminCache {
    inner: Cache<CacheKey, CacheValue>,
}

impl Default for AdminCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl AdminCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder().max_capacity(100).time_to_live(ttl).build();
        Self { inner }
    }

    pub async fn public_settings(&self) -> Option<Arc<BTreeMap<String, String>>> {
        match self.inner.get(&CacheKey::PublicSettings).await {
            Some(CacheValue::Settings(settings)) => Some(settings),
            _ => None,
        }
    }

    pub async fn set_public_settings(&self, settings: Arc<BTreeMap<String, String>>) {
        self.inner
            .insert(CacheKey::PublicSettings, CacheValue::Settings(settings))
            .await;
    }

    pub async fn public_categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.inner.get(&CacheKey::PublicCategories).await {
            Some(CacheValue::Categories(categories)) => Some(categories),
            _ => None,
        }
    }

    pub async fn set_public_categories(&self, categories: Arc<Vec<Category>>) {
        self.inner
            .insert(CacheKey::PublicCategories, CacheValue::Categories(categories))
            .await;
    }

    pub async fn public_products(&self) -> Option<Arc<Vec<ProductWithCategory>>> {
        match self.inner.get(&CacheKey::PublicProducts).await {
            Some(CacheValue::Products(products)) => Some(products),
            _ => None,
        }
    }

    pub async fn set_public_products(&self, products: Arc<Vec<ProductWithCategory>>) {
        self.inner
            .insert(CacheKey::PublicProducts, CacheValue::Products(products))
            .await;
    }

    /// Drop cached settings.
    pub async fn invalidate_settings(&self) {
        self.inner.invalidate(&CacheKey::PublicSettings).await;
    }

    /// Drop both cached catalog lists. Category changes affect which products
    /// are public, so they always go together.
    pub async fn invalidate_catalog(&self) {
        self.inner.invalidate(&CacheKey::PublicCategories).await;
        self.inner.invalidate(&CacheKey::PublicProducts).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> Arc<BTreeMap<String, String>> {
        Arc::new(BTreeMap::from([(
            "storeName".to_owned(),
            "Zeytin Commerce".to_owned(),
        )]))
    }

    #[tokio::test]
    async fn test_settings_roundtrip_and_invalidate() {
        let cache = AdminCache::default();
        assert!(cache.public_settings().await.is_none());

        cache.set_public_settings(settings()).await;
        let cached = cache.public_settings().await.unwrap();
        assert_eq!(cached["storeName"], "Zeytin Commerce");

        cache.invalidate_settings().await;
        assert!(cache.public_settings().await.is_none());
    }

    #[tokio::test]
    async fn test_catalog_invalidation_keeps_settings() {
        let cache = AdminCache::default();
        cache.set_public_settings(settings()).await;
        cache.set_public_categories(Arc::new(Vec::new())).await;
        cache.set_public_products(Arc::new(Vec::new())).await;

        cache.invalidate_catalog().await;
        assert!(cache.public_categories().await.is_none());
        assert!(cache.public_products().await.is_none());
        assert!(cache.public_settings().await.is_some());

        cache.invalidate_all().await;
        assert!(cache.public_settings().await.is_none());
    }
}
