//! Price arithmetic shared by matching, tolerance checks, and risk scoring.
//!
//! Every helper here is total: malformed numbers and overflow degrade to `None` instead of
//! panicking, so a single bad line item can never take down an invoice evaluation.

use rust_decimal::Decimal;

use super::domain::{coerce, LineItem, PricingRule};

/// Quantity billed on the line, defaulting to one when missing, zero, or non-numeric.
pub fn resolve_quantity(item: &LineItem) -> Decimal {
    coerce(&item.quantity)
        .filter(|quantity| !quantity.is_zero())
        .unwrap_or(Decimal::ONE)
}

/// Amount actually billed for a line item.
///
/// Prefers the stated total, then `unit_price * quantity`. Negative resolutions are not
/// evaluable.
pub fn actual_price(item: &LineItem) -> Option<Decimal> {
    coerce(&item.total_price)
        .or_else(|| {
            coerce(&item.unit_price)
                .and_then(|unit_price| unit_price.checked_mul(resolve_quantity(item)))
        })
        .filter(|price| *price >= Decimal::ZERO)
}

/// Amount the contract allows for the line under `rule`.
///
/// The first price term present wins: flat fee (quantity ignored), then unit price, then
/// price cap (both scaled by quantity). A present but non-numeric term yields `None`.
pub fn expected_price(item: &LineItem, rule: &PricingRule) -> Option<Decimal> {
    let quantity = resolve_quantity(item);

    if let Some(flat_fee) = &rule.flat_fee {
        return flat_fee.to_decimal();
    }

    if let Some(unit_price) = &rule.unit_price {
        return unit_price.to_decimal()?.checked_mul(quantity);
    }

    if let Some(price_cap) = &rule.price_cap {
        return price_cap.to_decimal()?.checked_mul(quantity);
    }

    None
}
