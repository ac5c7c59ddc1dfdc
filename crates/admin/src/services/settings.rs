//! Store settings service.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use zeytin_core::Email;
use zeytin_core::validation::Violations;

use super::cache::AdminCache;
use super::realtime::{EventBus, EventName};
use crate::db::settings;
use crate::error::Result;

/// Keys readable without a session.
pub const PUBLIC_SETTING_KEYS: [&str; 6] = [
    "storeName",
    "supportEmail",
    "currency",
    "timezone",
    "taxRate",
    "websiteConfig",
];

/// `PUT /api/settings` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsInput {
    pub store_name: Option<String>,
    pub support_email: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub website_config: Option<String>,
}

impl UpdateSettingsInput {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut v = Violations::new();
        if let Some(email) = &self.support_email {
            v.check(Email::parse(email).is_ok(), || {
                "supportEmail must be an email".to_owned()
            });
        }
        if let Some(rate) = self.tax_rate {
            v.check(rate >= Decimal::ZERO, || {
                "taxRate must not be less than 0".to_owned()
            });
            v.check(rate <= Decimal::ONE_HUNDRED, || {
                "taxRate must not be greater than 100".to_owned()
            });
        }
        v
    }

    /// The provided fields as stored key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        [
            ("storeName", self.store_name),
            ("supportEmail", self.support_email),
            ("currency", self.currency),
            ("timezone", self.timezone),
            ("taxRate", self.tax_rate.map(|rate| rate.normalize().to_string())),
            ("websiteConfig", self.website_config),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
    }
}

/// Keep only the publicly readable keys.
#[must_use]
pub fn public_subset(all: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    all.iter()
        .filter(|(key, _)| PUBLIC_SETTING_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Settings service.
pub struct SettingsService<'a> {
    pool: &'a PgPool,
    cache: &'a AdminCache,
    events: &'a EventBus,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a AdminCache, events: &'a EventBus) -> Self {
        Self {
            pool,
            cache,
            events,
        }
    }

    /// Every setting, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn all(&self) -> Result<BTreeMap<String, String>> {
        Ok(settings::get_all(self.pool).await?)
    }

    /// The public subset, served from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn public(&self) -> Result<Arc<BTreeMap<String, String>>> {
        if let Some(cached) = self.cache.public_settings().await {
            return Ok(cached);
        }

        let public = Arc::new(public_subset(&settings::get_all(self.pool).await?));
        self.cache.set_public_settings(Arc::clone(&public)).await;
        Ok(public)
    }

    /// Upsert the provided fields and return the full map.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is invalid.
    /// Returns `AppError::Database` if a write fails.
    pub async fn update(&self, input: UpdateSettingsInput) -> Result<BTreeMap<String, String>> {
        input.validate().into_result()?;

        let mut tx = self.pool.begin().await?;
        for (key, value) in input.into_pairs() {
            settings::upsert(&mut *tx, key, &value).await?;
        }
        tx.commit().await?;

        self.cache.invalidate_settings().await;
        let all = settings::get_all(self.pool).await?;

        self.events
            .publish(
                EventName::SettingsUpdated,
                json!({ "settings": all, "updatedAt": Utc::now() }),
            )
            .await;

        Ok(all)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_into_pairs_skips_absent_fields() {
        let input = UpdateSettingsInput {
            store_name: Some("Zeytin Dukkani".to_owned()),
            tax_rate: Some(Decimal::new(1850, 2)),
            ..Default::default()
        };
        assert_eq!(
            input.into_pairs(),
            vec![
                ("storeName", "Zeytin Dukkani".to_owned()),
                ("taxRate", "18.5".to_owned()),
            ]
        );
    }

    #[test]
    fn test_whole_tax_rate_is_stored_without_decimals() {
        let input = UpdateSettingsInput {
            tax_rate: Some(Decimal::new(2000, 2)),
            ..Default::default()
        };
        assert_eq!(input.into_pairs(), vec![("taxRate", "20".to_owned())]);
    }

    #[test]
    fn test_validate() {
        let input = UpdateSettingsInput {
            support_email: Some("not-an-email".to_owned()),
            tax_rate: Some(Decimal::new(101, 0)),
            ..Default::default()
        };
        assert_eq!(
            input.validate().messages,
            vec![
                "supportEmail must be an email".to_owned(),
                "taxRate must not be greater than 100".to_owned(),
            ]
        );
        assert!(UpdateSettingsInput::default().validate().is_empty());
    }

    #[test]
    fn test_public_subset() {
        let all = BTreeMap::from([
            ("storeName".to_owned(), "Zeytin".to_owned()),
            ("internalFlag".to_owned(), "1".to_owned()),
            ("taxRate".to_owned(), "20".to_owned()),
        ]);
        let public = public_subset(&all);
        assert_eq!(public.len(), 2);
        assert!(!public.contains_key("internalFlag"));
    }
}
