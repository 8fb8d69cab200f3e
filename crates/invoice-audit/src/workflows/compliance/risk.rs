use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use super::domain::{coerce, Invoice, LineItem};
use super::explainer::Violation;
use super::pricing::actual_price;

/// Total billed on the invoice.
///
/// Uses `subtotal + tax` when the subtotal is numeric (tax defaults to zero), otherwise the
/// sum of each line's actual price with unresolvable lines counted as zero.
pub fn invoice_total(invoice: &Invoice, line_items: &[LineItem]) -> Option<Decimal> {
    match coerce(&invoice.subtotal_amount) {
        Some(subtotal) => {
            subtotal.checked_add(coerce(&invoice.tax_amount).unwrap_or(Decimal::ZERO))
        }
        None => sum(line_items.iter().map(|item| actual_price(item).unwrap_or_default())),
    }
}

/// Most the invoice could legally total: flagged lines at their expected price, every
/// other line at its actual price.
pub fn max_legal_amount(line_items: &[LineItem], violations: &[Violation]) -> Option<Decimal> {
    let by_line: HashMap<&str, &Violation> = violations
        .iter()
        .filter(|violation| !violation.line_id.is_empty())
        .map(|violation| (violation.line_id.as_str(), violation))
        .collect();

    sum(line_items.iter().map(|item| match by_line.get(item.line_id.as_str()) {
        Some(violation) => violation.expected_price,
        None => actual_price(item).unwrap_or_default(),
    }))
}

/// Share of the legally payable amount that was overbilled, rounded to four places.
///
/// `None` means the score is unknown (no positive invoice total or legal maximum) and must
/// not be read as zero risk.
pub fn risk_score(
    invoice: &Invoice,
    line_items: &[LineItem],
    violations: &[Violation],
) -> Option<Decimal> {
    let total = match invoice_total(invoice, line_items) {
        Some(total) if total > Decimal::ZERO => total,
        other => {
            warn!(invoice_id = %invoice.invoice_id, total = ?other, "risk score unavailable: no positive invoice total");
            return None;
        }
    };

    let legal = match max_legal_amount(line_items, violations) {
        Some(legal) => legal.min(total),
        None => {
            warn!(invoice_id = %invoice.invoice_id, "risk score unavailable: legal maximum overflowed");
            return None;
        }
    };

    if legal <= Decimal::ZERO {
        warn!(invoice_id = %invoice.invoice_id, %legal, "risk score unavailable: no positive legal maximum");
        return None;
    }

    let score = (total - legal).checked_div(legal)?;
    Some(score.max(Decimal::ZERO).round_dp(4))
}

fn sum(mut amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}
