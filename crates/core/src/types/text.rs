//! Normalization helpers for free-text input.

/// Trim a value and map blank strings to `None`.
///
/// ```
/// use zeytin_core::text::to_nullable;
///
/// assert_eq!(to_nullable(Some("  Aras Kargo ")), Some("Aras Kargo".to_owned()));
/// assert_eq!(to_nullable(Some("   ")), None);
/// assert_eq!(to_nullable(None), None);
/// ```
#[must_use]
pub fn to_nullable(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Trim every entry and drop the blank ones.
#[must_use]
pub fn normalize_string_list(values: Option<&[String]>) -> Vec<String> {
    values
        .unwrap_or_default()
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
