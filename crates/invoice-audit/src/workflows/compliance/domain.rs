use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Violation label applied when a rule does not name one.
pub const DEFAULT_VIOLATION_TYPE: &str = "Price Cap Exceeded";

/// Loosely typed numeric field as emitted by upstream extraction.
///
/// Extraction services hand back numbers, numeric strings, nulls, and the occasional
/// nonsense value for the same field. The raw value is retained verbatim and coerced on
/// demand so that a bad field degrades to "absent" instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Numeric(pub Value);

impl Numeric {
    /// Coerce to a finite decimal, or `None` for anything that is not numeric.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match &self.0 {
            Value::Number(number) => parse_decimal(&number.to_string()),
            Value::String(text) => parse_decimal(text.trim()),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.to_decimal().and_then(|value| value.to_f64())
    }

    /// Truthiness of the raw value: null, zero, and empty values count as unset.
    pub fn is_set(&self) -> bool {
        is_truthy(&self.0)
    }

    /// Raw rendering used when echoing the upstream value into free text.
    pub fn raw_display(&self) -> String {
        match &self.0 {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Null, `false`, zero, and empty strings or collections are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|value| value != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl From<Decimal> for Numeric {
    fn from(value: Decimal) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self(Value::from(value))
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<&str> for Numeric {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

pub(crate) fn coerce(field: &Option<Numeric>) -> Option<Decimal> {
    field.as_ref().and_then(Numeric::to_decimal)
}

/// One billable entry on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "loose_text")]
    pub line_id: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub description: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub service_code: Option<String>,
    #[serde(default)]
    pub quantity: Option<Numeric>,
    #[serde(default)]
    pub unit_price: Option<Numeric>,
    #[serde(default)]
    pub total_price: Option<Numeric>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl LineItem {
    pub fn new(line_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            description: description.into(),
            service_code: None,
            quantity: None,
            unit_price: None,
            total_price: None,
            metadata: Value::Null,
        }
    }

    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into());
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<Numeric>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_unit_price(mut self, price: impl Into<Numeric>) -> Self {
        self.unit_price = Some(price.into());
        self
    }

    pub fn with_total_price(mut self, price: impl Into<Numeric>) -> Self {
        self.total_price = Some(price.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Contract-derived pricing constraint, already extracted from clause text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingRule {
    #[serde(default, deserialize_with = "loose_string")]
    pub service_code: Option<String>,
    #[serde(default, deserialize_with = "loose_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub flat_fee: Option<Numeric>,
    #[serde(default)]
    pub unit_price: Option<Numeric>,
    #[serde(default)]
    pub price_cap: Option<Numeric>,
    #[serde(default)]
    pub tolerance_amount: Option<Numeric>,
    #[serde(default)]
    pub tolerance_percent: Option<Numeric>,
    #[serde(default, deserialize_with = "loose_string")]
    pub violation_type: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub clause_reference: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub notes: Option<String>,
}

impl PricingRule {
    pub fn violation_type(&self) -> &str {
        self.violation_type
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(DEFAULT_VIOLATION_TYPE)
    }

    pub fn clause_reference(&self) -> Option<&str> {
        self.clause_reference
            .as_deref()
            .filter(|reference| !reference.is_empty())
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|notes| !notes.is_empty())
    }

    /// Absolute tolerance, zero when absent or non-numeric.
    pub fn tolerance_amount(&self) -> Decimal {
        coerce(&self.tolerance_amount).unwrap_or(Decimal::ZERO)
    }

    /// Percentage tolerance, zero when absent or non-numeric.
    pub fn tolerance_percent(&self) -> Decimal {
        coerce(&self.tolerance_percent).unwrap_or(Decimal::ZERO)
    }

    pub fn has_price_terms(&self) -> bool {
        [&self.unit_price, &self.price_cap, &self.flat_fee]
            .into_iter()
            .any(|field| field.as_ref().map(Numeric::is_set).unwrap_or(false))
    }
}

/// Rule list as returned by the rule extractor, with any extractor notes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingRuleSet {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rules: Vec<PricingRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PricingRuleSet {
    pub fn new(rules: Vec<PricingRule>) -> Self {
        Self { rules, notes: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            notes: Some(reason.into()),
        }
    }
}

/// Invoice header plus its stored line items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default, deserialize_with = "loose_text")]
    pub invoice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<i64>,
    #[serde(default)]
    pub subtotal_amount: Option<Numeric>,
    #[serde(default)]
    pub tax_amount: Option<Numeric>,
    #[serde(default, deserialize_with = "loose_string")]
    pub seller_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub line_items: Vec<LineItem>,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn loose_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let keywords = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(keywords)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
