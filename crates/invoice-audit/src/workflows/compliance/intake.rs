use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{coerce, Invoice, LineItem, Numeric};

/// Where the evaluated line items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemSource {
    Stored,
    Inferred,
}

/// Line items ready for evaluation: stored lines with stable ids, or one inferred line
/// when the invoice carries none.
pub fn prepare_line_items(invoice: &Invoice) -> (Vec<LineItem>, LineItemSource) {
    if invoice.line_items.is_empty() {
        return (synthesize_line_items(invoice), LineItemSource::Inferred);
    }

    let items = invoice
        .line_items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let mut item = item.clone();
            if item.line_id.trim().is_empty() {
                item.line_id = format!("{}_line_{}", invoice.invoice_id, position + 1);
            }
            item
        })
        .collect();

    (items, LineItemSource::Stored)
}

/// Approximate a single charge from the invoice header.
///
/// Returns nothing when the subtotal is missing or non-numeric.
pub fn synthesize_line_items(invoice: &Invoice) -> Vec<LineItem> {
    let Some(subtotal) = coerce(&invoice.subtotal_amount) else {
        warn!(invoice_id = %invoice.invoice_id, "missing subtotal_amount; unable to infer line items");
        return Vec::new();
    };
    let tax = coerce(&invoice.tax_amount).unwrap_or(Decimal::ZERO);
    let Some(total) = subtotal.checked_add(tax) else {
        return Vec::new();
    };

    let description = invoice
        .summary
        .as_deref()
        .filter(|summary| !summary.is_empty())
        .unwrap_or("Invoice total");

    info!(invoice_id = %invoice.invoice_id, %subtotal, %tax, "generated synthetic line item");

    vec![LineItem::new(format!("{}_total", invoice.invoice_id), description)
        .with_quantity(1i64)
        .with_unit_price(Numeric::from(subtotal))
        .with_total_price(Numeric::from(total))
        .with_metadata(json!({
            "source": "synthetic",
            "subtotal_amount": json_number(subtotal),
            "tax_amount": json_number(tax),
        }))]
}

fn json_number(amount: Decimal) -> Value {
    amount
        .to_f64()
        .map(Value::from)
        .unwrap_or_else(|| Value::String(amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::compliance::pricing::actual_price;

    fn header(subtotal: Option<Numeric>, tax: Option<Numeric>) -> Invoice {
        Invoice {
            invoice_id: "INV-100".to_string(),
            subtotal_amount: subtotal,
            tax_amount: tax,
            summary: Some("Monthly janitorial services".to_string()),
            ..Invoice::default()
        }
    }

    #[test]
    fn synthesizes_single_line_from_subtotal_and_tax() {
        let invoice = header(Some(Numeric::from(1000i64)), Some(Numeric::from("80")));

        let (items, source) = prepare_line_items(&invoice);

        assert_eq!(source, LineItemSource::Inferred);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_id, "INV-100_total");
        assert_eq!(items[0].description, "Monthly janitorial services");
        assert_eq!(actual_price(&items[0]), Some(Decimal::from(1080)));
        assert_eq!(items[0].metadata["source"], "synthetic");
    }

    #[test]
    fn no_synthetic_line_without_numeric_subtotal() {
        let invoice = header(Some(Numeric::from("pending")), None);
        assert!(synthesize_line_items(&invoice).is_empty());
    }

    #[test]
    fn blank_line_ids_receive_positional_ids() {
        let mut invoice = header(None, None);
        invoice.line_items = vec![
            LineItem::new("A", "Mopping").with_total_price(10i64),
            LineItem::new("  ", "Waxing").with_total_price(20i64),
        ];

        let (items, source) = prepare_line_items(&invoice);

        assert_eq!(source, LineItemSource::Stored);
        assert_eq!(items[0].line_id, "A");
        assert_eq!(items[1].line_id, "INV-100_line_2");
    }
}
