//! Contract context selection over nearest-neighbour search results.
//!
//! Embedding and search happen behind the [`ContractIndex`](super::ports::ContractIndex)
//! port; this module only filters candidates by vendor, picks the textual representation
//! handed to the rule extractor, and records what was used.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::domain::{Invoice, LineItem, Numeric};

const BUSINESS_SUFFIXES: [&str; 9] = [
    " inc.",
    " inc",
    ". inc",
    " llc",
    " ltd.",
    " ltd",
    " corporation",
    " corp.",
    " corp",
];

const PRICING_VOCABULARY: &str =
    "pricing rates fees charges costs per unit maximum cap limit not to exceed";
const MAX_PRICING_CLAUSES: usize = 3;
const MAX_FULL_TEXT_CHARS: usize = 3000;
const QUERY_LINE_ITEMS: usize = 5;
const QUERY_SERVICE_TERMS: usize = 5;

/// Candidate contract chunk returned by the vector index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContractMatch {
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub pricing_sections: Option<String>,
    /// Structured clauses: a list, a JSON-encoded list, or null.
    #[serde(default)]
    pub clauses: Value,
    /// Service type tags: a list, a JSON-encoded list, or null.
    #[serde(default)]
    pub service_types: Value,
    #[serde(default)]
    pub similarity: Option<Numeric>,
}

/// Which representation of a contract fed the rule extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Clauses,
    PricingSections,
    FullText,
}

/// Traceability record for a contract that contributed context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseReference {
    pub contract_id: Option<String>,
    pub vendor_name: Option<String>,
    pub similarity: Option<f64>,
    pub service_types: Vec<Value>,
    pub context_source: ContextSource,
}

/// Context strings for the extractor plus the references they came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractContext {
    pub contexts: Vec<String>,
    pub references: Vec<ClauseReference>,
}

#[derive(Debug)]
struct PricingClause {
    clause_id: String,
    section_title: String,
    clause_text: String,
}

/// Lowercase the vendor and strip the first trailing business suffix.
pub fn normalize_vendor(name: &str) -> Option<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let stripped = BUSINESS_SUFFIXES
        .iter()
        .find_map(|suffix| normalized.strip_suffix(suffix))
        .map(|rest| rest.trim().to_string());

    Some(stripped.unwrap_or(normalized))
}

/// True when the normalized vendor appears in the match's vendor, text, or contract id.
pub fn mentions_vendor(candidate: &ContractMatch, normalized_vendor: &str) -> bool {
    [
        &candidate.vendor_name,
        &candidate.text,
        &candidate.contract_id,
    ]
    .into_iter()
    .any(|field| {
        field
            .as_deref()
            .map(|value| value.to_lowercase().contains(normalized_vendor))
            .unwrap_or(false)
    })
}

/// Filter candidates by vendor and choose one context per surviving contract.
pub fn select_contract_context(
    vendor_name: Option<&str>,
    matches: &[ContractMatch],
) -> ContractContext {
    let normalized_vendor = vendor_name.and_then(normalize_vendor);
    let mut context = ContractContext::default();

    for candidate in matches {
        if let Some(vendor) = normalized_vendor.as_deref() {
            if !mentions_vendor(candidate, vendor) {
                warn!(
                    contract_id = ?candidate.contract_id,
                    vendor = ?vendor_name,
                    "skipping contract that does not mention the invoice vendor"
                );
                continue;
            }
        }

        let pricing_clauses = pricing_clauses(&candidate.clauses);
        let pricing_sections = non_empty(&candidate.pricing_sections);

        let context_source = if !pricing_clauses.is_empty() {
            for clause in pricing_clauses.iter().take(MAX_PRICING_CLAUSES) {
                context.contexts.push(render_clause(clause));
            }
            ContextSource::Clauses
        } else if let Some(sections) = pricing_sections {
            context
                .contexts
                .push(format!("=== PRICING SECTIONS ===\n{sections}\n"));
            ContextSource::PricingSections
        } else if let Some(text) = non_empty(&candidate.text) {
            context.contexts.push(truncate_full_text(text));
            ContextSource::FullText
        } else if let Some(summary) = non_empty(&candidate.summary) {
            context.contexts.push(summary.to_string());
            ContextSource::FullText
        } else {
            debug!(contract_id = ?candidate.contract_id, "contract has no usable content");
            continue;
        };

        context.references.push(ClauseReference {
            contract_id: candidate.contract_id.clone(),
            vendor_name: candidate.vendor_name.clone(),
            similarity: candidate.similarity.as_ref().and_then(Numeric::to_f64),
            service_types: json_list(&candidate.service_types),
            context_source,
        });
    }

    if normalized_vendor.is_some() && context.contexts.is_empty() {
        error!(vendor = ?vendor_name, "no contracts passed the vendor filter");
    }

    context
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Accept a list directly or a JSON string that decodes to one.
fn json_list(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items.clone(),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn text_field(clause: &serde_json::Map<String, Value>, key: &str) -> String {
    clause
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn pricing_clauses(raw: &Value) -> Vec<PricingClause> {
    json_list(raw)
        .iter()
        .filter_map(Value::as_object)
        .filter(|clause| text_field(clause, "clause_type").eq_ignore_ascii_case("pricing"))
        .map(|clause| PricingClause {
            clause_id: text_field(clause, "clause_id"),
            section_title: text_field(clause, "section_title"),
            clause_text: text_field(clause, "clause_text"),
        })
        .filter(|clause| !clause.clause_text.is_empty())
        .collect()
}

fn render_clause(clause: &PricingClause) -> String {
    let heading = if clause.clause_id.is_empty() {
        "Pricing Clause"
    } else {
        clause.clause_id.as_str()
    };
    let mut rendered = format!("=== {heading} ===\n");
    if !clause.section_title.is_empty() {
        rendered.push_str(&format!("Section: {}\n", clause.section_title));
    }
    rendered.push_str(&clause.clause_text);
    rendered.push('\n');
    rendered
}

fn truncate_full_text(text: &str) -> String {
    if text.chars().count() > MAX_FULL_TEXT_CHARS {
        let head: String = text.chars().take(MAX_FULL_TEXT_CHARS).collect();
        format!("{head}... [truncated]")
    } else {
        text.to_string()
    }
}

/// Semantic search query aimed at the pricing clauses relevant to this invoice.
pub fn build_contract_query(invoice: &Invoice, line_items: &[LineItem]) -> String {
    let mut parts = vec![PRICING_VOCABULARY.to_string()];

    if let Some(seller) = invoice.seller_name.as_deref().filter(|name| !name.is_empty()) {
        parts.push(format!("Vendor: {seller}"));
    }
    if let Some(summary) = invoice.summary.as_deref().filter(|text| !text.is_empty()) {
        parts.push(format!("Invoice Summary: {summary}"));
    }

    let mut service_terms: Vec<String> = Vec::new();
    for item in line_items.iter().take(QUERY_LINE_ITEMS) {
        if !item.description.is_empty() {
            parts.push(format!("Service: {}", item.description));
            for word in item.description.to_lowercase().split_whitespace().take(3) {
                if !service_terms.iter().any(|term| term == word) {
                    service_terms.push(word.to_string());
                }
            }
        }
        if let Some(code) = item.service_code.as_deref().filter(|code| !code.is_empty()) {
            parts.push(format!("Service Code: {code}"));
        }
        if let Some(unit_price) = item.unit_price.as_ref().filter(|price| price.is_set()) {
            parts.push(format!("Price: ${}", unit_price.raw_display()));
        }
    }

    if !service_terms.is_empty() {
        service_terms.truncate(QUERY_SERVICE_TERMS);
        parts.push(service_terms.join(" "));
    }

    parts.join(" | ")
}
