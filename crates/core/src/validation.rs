//! Field-level validation that reports every problem at once.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::{MAX_AMOUNT, column_max, fits_amount, has_max_decimals};

/// One or more request fields failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", .messages.join("; "))]
pub struct Violations {
    /// Human-readable messages, one per failed check.
    pub messages: Vec<String>,
}

impl Violations {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Record a failure.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Record `message` when `ok` is false.
    pub fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.messages.push(message());
        }
    }

    /// `value` (trimmed) must have at least `min` characters.
    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) {
        self.check(value.trim().chars().count() >= min, || {
            format!("{field} must be at least {min} characters")
        });
    }

    /// Optional variant of [`Self::min_chars`]; `None` passes.
    pub fn min_chars_opt(&mut self, field: &str, value: Option<&str>, min: usize) {
        if let Some(value) = value {
            self.min_chars(field, value, min);
        }
    }

    /// `value` must not exceed `max`.
    pub fn at_most(&mut self, field: &str, value: Decimal, max: Decimal) {
        self.check(value <= max, || {
            format!("{field} must not be greater than {max}")
        });
    }

    /// `value` must be `>= 0` with at most `places` decimals and fit its
    /// `NUMERIC(10, places)` column.
    pub fn non_negative_amount(&mut self, field: &str, value: Decimal, places: u32) {
        self.check(value >= Decimal::ZERO, || {
            format!("{field} must not be less than 0")
        });
        self.at_most(field, value, column_max(places));
        self.check(has_max_decimals(value, places), || {
            format!("{field} must have at most {places} decimal places")
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Merge the failures of a nested value, prefixing each with `prefix.`.
    pub fn extend_prefixed(&mut self, prefix: &str, nested: Self) {
        self.messages.extend(
            nested
                .messages
                .into_iter()
                .map(|message| format!("{prefix}.{message}")),
        );
    }

    /// `Ok(())` when nothing failed.
    ///
    /// # Errors
    ///
    /// Returns `self` if any check failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// The result of checked arithmetic on an amount, or a violation naming
/// `field` when it overflowed or left the `NUMERIC(10,2)` range.
///
/// # Errors
///
/// Returns a single-message [`Violations`] for `None` or an out-of-range value.
pub fn bounded_amount(field: &str, value: Option<Decimal>) -> Result<Decimal, Violations> {
    match value {
        Some(value) if fits_amount(value) => Ok(value),
        _ => Err(Violations::from(format!(
            "{field} must not be greater than {MAX_AMOUNT}"
        ))),
    }
}

impl From<String> for Violations {
    fn from(message: String) -> Self {
        Self {
            messages: vec![message],
        }
    }
}

impl From<&str> for Violations {
    fn from(message: &str) -> Self {
        Self::from(message.to_owned())
    }
}
