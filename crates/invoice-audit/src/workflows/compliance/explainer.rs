use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{coerce, is_truthy, LineItem, PricingRule};
use super::pricing::resolve_quantity;
use super::tolerance::ToleranceCheck;

/// Detected overcharge on a single line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub line_id: String,
    pub violation_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
    pub clause_reference: Option<String>,
    pub reasoning: ViolationReasoning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_location: Option<Value>,
}

/// Structured justification attached to every violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationReasoning {
    pub explanation: String,
    pub expected_value: ExpectedValue,
    pub actual_value: ActualValue,
    pub contract_requirement: ContractRequirement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub unit_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub flat_fee: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_cap: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualValue {
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub unit_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub line_item_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRequirement {
    pub clause_reference: Option<String>,
    pub notes: Option<String>,
    pub violation_type: Option<String>,
}

/// Build the violation record for a check that fired.
pub fn build_violation(item: &LineItem, rule: &PricingRule, check: &ToleranceCheck) -> Violation {
    Violation {
        line_id: item.line_id.clone(),
        violation_type: rule.violation_type().to_string(),
        expected_price: check.expected_price.round_dp(2),
        actual_price: check.actual_price.round_dp(2),
        difference: check.difference.round_dp(2),
        clause_reference: rule.clause_reference().map(str::to_string),
        reasoning: explain(item, rule, check),
        pdf_location: pdf_location(&item.metadata),
    }
}

/// Derive the prose explanation and the machine-readable breakdown for a violation.
pub fn explain(item: &LineItem, rule: &PricingRule, check: &ToleranceCheck) -> ViolationReasoning {
    let quantity = resolve_quantity(item);
    let description = if item.description.trim().is_empty() {
        "N/A"
    } else {
        item.description.as_str()
    };

    let expected_description = expected_description(rule, quantity, check.expected_price);
    let actual_description = actual_description(item, quantity, check.actual_price);

    let mut parts = vec![format!("Violation detected for line item: {description}")];
    if let Some(code) = item.service_code.as_deref().filter(|code| !code.is_empty()) {
        parts.push(format!("Service Code: {code}"));
    }
    parts.push(format!(
        "The contract {} specifies: {}",
        rule.clause_reference().unwrap_or_default(),
        rule.notes().unwrap_or_default()
    ));
    parts.push(format!("Expected: {expected_description}"));
    parts.push(format!("Invoice shows: {actual_description}"));
    parts.push(format!(
        "Difference: {} over the contract limit",
        money(check.difference)
    ));

    ViolationReasoning {
        explanation: parts.join(" "),
        expected_value: ExpectedValue {
            description: expected_description,
            amount: check.expected_price.round_dp(2),
            unit_price: rounded(coerce(&rule.unit_price)),
            flat_fee: rounded(coerce(&rule.flat_fee)),
            price_cap: rounded(coerce(&rule.price_cap)),
        },
        actual_value: ActualValue {
            description: actual_description,
            amount: check.actual_price.round_dp(2),
            unit_price: rounded(coerce(&item.unit_price)),
            quantity: quantity.round_dp(2),
            line_item_description: description.to_string(),
        },
        contract_requirement: ContractRequirement {
            clause_reference: rule.clause_reference().map(str::to_string),
            notes: rule.notes().map(str::to_string),
            violation_type: Some(rule.violation_type().to_string()),
        },
    }
}

fn expected_description(rule: &PricingRule, quantity: Decimal, expected: Decimal) -> String {
    if let Some(flat_fee) = coerce(&rule.flat_fee) {
        return format!("{} (flat fee)", money(flat_fee));
    }
    if let Some(unit_price) = coerce(&rule.unit_price) {
        return per_unit(unit_price, quantity);
    }
    if let Some(price_cap) = coerce(&rule.price_cap) {
        return format!("Maximum {}", money(price_cap));
    }
    money(expected)
}

fn actual_description(item: &LineItem, quantity: Decimal, actual: Decimal) -> String {
    if let Some(total_price) = coerce(&item.total_price) {
        return money(total_price);
    }
    if let Some(unit_price) = coerce(&item.unit_price) {
        return per_unit(unit_price, quantity);
    }
    money(actual)
}

fn per_unit(unit_price: Decimal, quantity: Decimal) -> String {
    let total = unit_price
        .checked_mul(quantity)
        .map(money)
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{} per unit × {} = {}",
        money(unit_price),
        quantity.normalize(),
        total
    )
}

/// Format an amount as `$X.XX`.
pub(crate) fn money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    format!("${rounded}")
}

fn rounded(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|amount| amount.round_dp(2))
}

/// Bounding box of the line on the source PDF, copied through uninterpreted.
///
/// Metadata may arrive as an object or as a JSON-encoded string; anything else, or a falsy
/// location value, yields no location.
pub fn pdf_location(metadata: &Value) -> Option<Value> {
    let parsed;
    let fields = match metadata {
        Value::Object(fields) => fields,
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).ok()?;
            parsed.as_object()?
        }
        _ => return None,
    };

    fields
        .get("pdf_location")
        .or_else(|| fields.get("pdfLocation"))
        .filter(|location| is_truthy(location))
        .cloned()
}
