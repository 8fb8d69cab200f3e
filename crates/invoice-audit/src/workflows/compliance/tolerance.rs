use rust_decimal::Decimal;

use super::domain::{LineItem, PricingRule};
use super::pricing::{actual_price, expected_price};

/// Price comparison for a line item under its matched rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceCheck {
    pub expected_price: Decimal,
    pub actual_price: Decimal,
    pub difference: Decimal,
    pub exceeds_amount: bool,
    pub exceeds_percent: bool,
    pub is_violation: bool,
}

/// Compare actual against expected price under the rule's tolerances.
///
/// Returns `None` when either price cannot be resolved; that is "not evaluable", never a
/// violation. A violation requires a positive overage and one of: the absolute tolerance
/// is exceeded, the percentage tolerance is exceeded, or the absolute tolerance is zero.
/// The last disjunct is what flags percent-only rules whose expected price is zero.
pub fn check_tolerance(item: &LineItem, rule: &PricingRule) -> Option<ToleranceCheck> {
    let actual = actual_price(item)?;
    let expected = expected_price(item, rule)?;
    let difference = actual.checked_sub(expected)?;

    let tolerance_amount = rule.tolerance_amount();
    let tolerance_percent = rule.tolerance_percent();

    let exceeds_amount = difference > tolerance_amount;
    let exceeds_percent = tolerance_percent > Decimal::ZERO
        && expected > Decimal::ZERO
        && overage_percent(difference, expected)
            .map(|percent| percent > tolerance_percent)
            // overflow only happens for astronomically large ratios
            .unwrap_or(true);

    let is_violation = difference > Decimal::ZERO
        && (exceeds_amount || exceeds_percent || tolerance_amount.is_zero());

    Some(ToleranceCheck {
        expected_price: expected,
        actual_price: actual,
        difference,
        exceeds_amount,
        exceeds_percent,
        is_violation,
    })
}

fn overage_percent(difference: Decimal, expected: Decimal) -> Option<Decimal> {
    difference
        .checked_div(expected)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
