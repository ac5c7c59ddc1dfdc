//! Pricing policy calculator.
//!
//! A product carries a [`PricingPolicy`] (target margin and variable-cost
//! percentages, per-unit fixed costs) plus free-form [`ExpenseItem`]s. From
//! those and the unit cost, [`calculate_summary`] derives the minimum net
//! price that covers costs, the suggested net and gross sale prices, and the
//! profit the current sale price actually yields.
//!
//! All values are stored inside JSONB columns as plain JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round2;
use crate::validation::Violations;

/// Upper bound for any single percentage input.
const MAX_PERCENT: Decimal = Decimal::from_parts(95, 0, 0, false, 0);
/// Smallest divisor used when grossing up, so 100% cost shares stay finite.
const MIN_DENOMINATOR: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Default target margin for new products.
const DEFAULT_TARGET_MARGIN: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Per-product pricing inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingPolicy {
    #[serde(with = "rust_decimal::serde::float")]
    pub target_margin_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_commission_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub payment_fee_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub marketing_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub operational_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_buffer_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub packaging_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fixed_cost: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            target_margin_percent: DEFAULT_TARGET_MARGIN,
            platform_commission_percent: Decimal::ZERO,
            payment_fee_percent: Decimal::ZERO,
            marketing_percent: Decimal::ZERO,
            operational_percent: Decimal::ZERO,
            discount_buffer_percent: Decimal::ZERO,
            packaging_cost: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            fixed_cost: Decimal::ZERO,
        }
    }
}

/// A partial policy as submitted by the admin UI. Missing fields fall back
/// to the stored policy, then to [`PricingPolicy::default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicyInput {
    pub target_margin_percent: Option<Decimal>,
    pub platform_commission_percent: Option<Decimal>,
    pub payment_fee_percent: Option<Decimal>,
    pub marketing_percent: Option<Decimal>,
    pub operational_percent: Option<Decimal>,
    pub discount_buffer_percent: Option<Decimal>,
    pub packaging_cost: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub fixed_cost: Option<Decimal>,
}

impl PricingPolicyInput {
    /// Iterate over every provided value with its field name.
    pub fn provided(&self) -> impl Iterator<Item = (&'static str, Decimal)> {
        [
            ("targetMarginPercent", self.target_margin_percent),
            ("platformCommissionPercent", self.platform_commission_percent),
            ("paymentFeePercent", self.payment_fee_percent),
            ("marketingPercent", self.marketing_percent),
            ("operationalPercent", self.operational_percent),
            ("discountBufferPercent", self.discount_buffer_percent),
            ("packagingCost", self.packaging_cost),
            ("shippingCost", self.shipping_cost),
            ("fixedCost", self.fixed_cost),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

impl PricingPolicy {
    /// Merge `input` over `fallback` (or the default policy), clamping every
    /// percentage to `0..=95` and every amount to `>= 0`.
    #[must_use]
    pub fn normalize(input: Option<&PricingPolicyInput>, fallback: Option<&Self>) -> Self {
        let base = fallback.copied().unwrap_or_default();
        let input = input.copied().unwrap_or_default();

        Self {
            target_margin_percent: clamp_percent(
                input
                    .target_margin_percent
                    .unwrap_or(base.target_margin_percent),
            ),
            platform_commission_percent: clamp_percent(
                input
                    .platform_commission_percent
                    .unwrap_or(base.platform_commission_percent),
            ),
            payment_fee_percent: clamp_percent(
                input.payment_fee_percent.unwrap_or(base.payment_fee_percent),
            ),
            marketing_percent: clamp_percent(
                input.marketing_percent.unwrap_or(base.marketing_percent),
            ),
            operational_percent: clamp_percent(
                input.operational_percent.unwrap_or(base.operational_percent),
            ),
            discount_buffer_percent: clamp_percent(
                input
                    .discount_buffer_percent
                    .unwrap_or(base.discount_buffer_percent),
            ),
            packaging_cost: normalize_amount(input.packaging_cost.unwrap_or(base.packaging_cost)),
            shipping_cost: normalize_amount(input.shipping_cost.unwrap_or(base.shipping_cost)),
            fixed_cost: normalize_amount(input.fixed_cost.unwrap_or(base.fixed_cost)),
        }
    }

    /// Sum of the variable (percentage-of-sale) cost shares.
    #[must_use]
    pub fn variable_expense_percent(&self) -> Decimal {
        round2(
            self.platform_commission_percent
                + self.payment_fee_percent
                + self.marketing_percent
                + self.operational_percent
                + self.discount_buffer_percent,
        )
    }
}

/// An extra fixed per-unit cost line (labels, inserts, gift wrap...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Trim names, normalize amounts and drop unnamed items.
#[must_use]
pub fn normalize_expense_items(items: &[ExpenseItem]) -> Vec<ExpenseItem> {
    items
        .iter()
        .map(|item| ExpenseItem {
            name: item.name.trim().to_owned(),
            amount: normalize_amount(item.amount),
        })
        .filter(|item| !item.name.is_empty())
        .collect()
}

/// Derived pricing figures, stored alongside the product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fixed_expense_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub variable_expense_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub minimum_net_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub suggested_net_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub suggested_sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_margin_percent: Decimal,
}

/// Everything [`calculate_summary`] needs.
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a> {
    pub cost_price: Decimal,
    pub tax_rate: Decimal,
    pub vat_included: bool,
    pub policy: &'a PricingPolicy,
    pub expense_items: &'a [ExpenseItem],
    pub current_sale_price: Decimal,
}

/// Clamp a percentage to `0..=95` and round to two places.
#[must_use]
pub fn clamp_percent(value: Decimal) -> Decimal {
    round2(value.clamp(Decimal::ZERO, MAX_PERCENT))
}

/// Clamp an amount to `>= 0` and round to two places.
#[must_use]
pub fn normalize_amount(value: Decimal) -> Decimal {
    round2(value.max(Decimal::ZERO))
}

fn overflowed() -> Violations {
    Violations::from("pricing inputs are too large to compute a summary")
}

/// Compute the pricing summary for one product.
///
/// The minimum net price covers the unit cost plus fixed expenses after the
/// variable cost shares are taken out. The suggested net price grosses that up
/// by the target margin, and the suggested sale price adds VAT when prices are
/// VAT-inclusive. The estimated profit and margin are evaluated at
/// `current_sale_price`.
///
/// # Errors
///
/// Returns [`Violations`] when any intermediate value overflows.
pub fn calculate_summary(input: &PricingInput<'_>) -> Result<PricingSummary, Violations> {
    let hundred = Decimal::ONE_HUNDRED;
    let policy = input.policy;

    let unit_cost = normalize_amount(input.cost_price);
    let tax_rate = clamp_percent(input.tax_rate);
    let expense_total = input
        .expense_items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount));
    let fixed_expense_total = [policy.packaging_cost, policy.shipping_cost, policy.fixed_cost]
        .into_iter()
        .try_fold(expense_total.ok_or_else(overflowed)?, |sum, amount| {
            sum.checked_add(amount)
        })
        .map(round2)
        .ok_or_else(overflowed)?;
    let variable_expense_percent = policy.variable_expense_percent();

    let base_cost = unit_cost
        .checked_add(fixed_expense_total)
        .ok_or_else(overflowed)?;
    let variable_denominator =
        (Decimal::ONE - variable_expense_percent / hundred).max(MIN_DENOMINATOR);
    let minimum_net_price = base_cost
        .checked_div(variable_denominator)
        .map(round2)
        .ok_or_else(overflowed)?;

    let margin_denominator =
        (Decimal::ONE - policy.target_margin_percent / hundred).max(MIN_DENOMINATOR);
    let suggested_net_price = minimum_net_price
        .checked_div(margin_denominator)
        .map(round2)
        .ok_or_else(overflowed)?;

    let tax_multiplier = Decimal::ONE + tax_rate / hundred;
    let suggested_sale_price = if input.vat_included {
        suggested_net_price
            .checked_mul(tax_multiplier)
            .ok_or_else(overflowed)?
    } else {
        suggested_net_price
    };
    let suggested_sale_price = round2(suggested_sale_price);

    let sale_price = normalize_amount(input.current_sale_price);
    let net_sale_price = if input.vat_included {
        sale_price / tax_multiplier
    } else {
        sale_price
    };
    let variable_cost_at_sale = net_sale_price
        .checked_mul(variable_expense_percent / hundred)
        .ok_or_else(overflowed)?;
    let estimated_profit = base_cost
        .checked_add(variable_cost_at_sale)
        .and_then(|cost| net_sale_price.checked_sub(cost))
        .map(round2)
        .ok_or_else(overflowed)?;
    let estimated_margin_percent = if net_sale_price > Decimal::ZERO {
        estimated_profit
            .checked_div(net_sale_price)
            .and_then(|ratio| ratio.checked_mul(hundred))
            .ok_or_else(overflowed)?
    } else {
        Decimal::ZERO
    };

    Ok(PricingSummary {
        unit_cost,
        fixed_expense_total,
        variable_expense_percent,
        minimum_net_price,
        suggested_net_price,
        suggested_sale_price,
        estimated_profit,
        estimated_margin_percent: round2(estimated_margin_percent),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(dec("120")), dec("95"));
        assert_eq!(clamp_percent(dec("-5")), Decimal::ZERO);
        assert_eq!(clamp_percent(dec("12.345")), dec("12.35"));
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(dec("-1")), Decimal::ZERO);
        assert_eq!(normalize_amount(dec("3.456")), dec("3.46"));
    }

    #[test]
    fn test_default_policy() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.target_margin_percent, dec("30"));
        assert_eq!(policy.variable_expense_percent(), Decimal::ZERO);
        assert_eq!(policy.fixed_cost, Decimal::ZERO);
    }

    #[test]
    fn test_normalize_merges_over_fallback() {
        let stored = PricingPolicy {
            target_margin_percent: dec("25"),
            packaging_cost: dec("4"),
            ..PricingPolicy::default()
        };
        let input = PricingPolicyInput {
            marketing_percent: Some(dec("150")),
            packaging_cost: Some(dec("-2")),
            ..PricingPolicyInput::default()
        };

        let merged = PricingPolicy::normalize(Some(&input), Some(&stored));
        assert_eq!(merged.target_margin_percent, dec("25"));
        assert_eq!(merged.marketing_percent, dec("95"));
        assert_eq!(merged.packaging_cost, Decimal::ZERO);

        let defaulted = PricingPolicy::normalize(None, None);
        assert_eq!(defaulted, PricingPolicy::default());
    }

    #[test]
    fn test_normalize_expense_items_drops_blank_names() {
        let items = vec![
            ExpenseItem {
                name: "  Etiket ".to_owned(),
                amount: dec("1.234"),
            },
            ExpenseItem {
                name: "   ".to_owned(),
                amount: dec("9"),
            },
        ];
        let normalized = normalize_expense_items(&items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].name, "Etiket");
        assert_eq!(normalized[0].amount, dec("1.23"));
    }

    #[test]
    fn test_summary_with_default_policy_and_vat() {
        let policy = PricingPolicy::default();
        let summary = calculate_summary(&PricingInput {
            cost_price: dec("100"),
            tax_rate: dec("20"),
            vat_included: true,
            policy: &policy,
            expense_items: &[],
            current_sale_price: dec("200"),
        })
        .unwrap();

        assert_eq!(summary.unit_cost, dec("100"));
        assert_eq!(summary.fixed_expense_total, Decimal::ZERO);
        assert_eq!(summary.minimum_net_price, dec("100"));
        assert_eq!(summary.suggested_net_price, dec("142.86"));
        assert_eq!(summary.suggested_sale_price, dec("171.43"));
        assert_eq!(summary.estimated_profit, dec("66.67"));
        assert_eq!(summary.estimated_margin_percent, dec("40.00"));
    }

    #[test]
    fn test_summary_with_variable_and_fixed_costs_without_vat() {
        let policy = PricingPolicy {
            target_margin_percent: dec("20"),
            platform_commission_percent: dec("10"),
            payment_fee_percent: dec("2.5"),
            packaging_cost: dec("5"),
            shipping_cost: dec("10"),
            ..PricingPolicy::default()
        };
        let expenses = normalize_expense_items(&[ExpenseItem {
            name: "Hediye kutusu".to_owned(),
            amount: dec("3.456"),
        }]);

        let summary = calculate_summary(&PricingInput {
            cost_price: dec("50"),
            tax_rate: dec("20"),
            vat_included: false,
            policy: &policy,
            expense_items: &expenses,
            current_sale_price: dec("120"),
        })
        .unwrap();

        assert_eq!(summary.fixed_expense_total, dec("18.46"));
        assert_eq!(summary.variable_expense_percent, dec("12.50"));
        assert_eq!(summary.minimum_net_price, dec("78.24"));
        assert_eq!(summary.suggested_net_price, dec("97.80"));
        assert_eq!(summary.suggested_sale_price, dec("97.80"));
        assert_eq!(summary.estimated_profit, dec("36.54"));
        assert_eq!(summary.estimated_margin_percent, dec("30.45"));
    }

    #[test]
    fn test_summary_denominator_floor() {
        let policy = PricingPolicy {
            target_margin_percent: Decimal::ZERO,
            platform_commission_percent: dec("95"),
            payment_fee_percent: dec("95"),
            ..PricingPolicy::default()
        };
        let summary = calculate_summary(&PricingInput {
            cost_price: dec("1"),
            tax_rate: Decimal::ZERO,
            vat_included: false,
            policy: &policy,
            expense_items: &[],
            current_sale_price: Decimal::ZERO,
        })
        .unwrap();

        assert_eq!(summary.variable_expense_percent, dec("190"));
        assert_eq!(summary.minimum_net_price, dec("100"));
        assert_eq!(summary.suggested_net_price, dec("100"));
        assert_eq!(summary.estimated_margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_summary_rejects_overflowing_cost() {
        let policy = PricingPolicy::default();
        let err = calculate_summary(&PricingInput {
            cost_price: dec("79228162514264337593543950335"),
            tax_rate: dec("20"),
            vat_included: true,
            policy: &policy,
            expense_items: &[],
            current_sale_price: dec("100"),
        })
        .unwrap_err();
        assert_eq!(
            err.messages,
            vec!["pricing inputs are too large to compute a summary"]
        );
    }

    #[test]
    fn test_summary_rejects_overflowing_expenses() {
        let policy = PricingPolicy {
            fixed_cost: Decimal::MAX,
            ..PricingPolicy::default()
        };
        let expenses = [ExpenseItem {
            name: "Etiket".to_owned(),
            amount: Decimal::MAX,
        }];
        let result = calculate_summary(&PricingInput {
            cost_price: dec("10"),
            tax_rate: Decimal::ZERO,
            vat_included: false,
            policy: &policy,
            expense_items: &expenses,
            current_sale_price: Decimal::ZERO,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_serializes_numbers() {
        let summary = PricingSummary {
            suggested_sale_price: dec("171.43"),
            ..PricingSummary::default()
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["suggestedSalePrice"], serde_json::json!(171.43));
        assert_eq!(json["unitCost"], serde_json::json!(0.0));
    }

    #[test]
    fn test_policy_deserializes_partial_blob() {
        let policy: PricingPolicy =
            serde_json::from_str(r#"{"targetMarginPercent": 40, "shippingCost": 12.5}"#).unwrap();
        assert_eq!(policy.target_margin_percent, dec("40"));
        assert_eq!(policy.shipping_cost, dec("12.5"));
        assert_eq!(policy.fixed_cost, Decimal::ZERO);
    }
}
