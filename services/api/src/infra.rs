use invoice_audit::error::AppError;
use invoice_audit::workflows::compliance::{Invoice, PricingRule, PricingRuleSet};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Rules as callers send them: a bare list or the extractor's `{ "rules": [...] }` shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum RulesPayload {
    List(Vec<PricingRule>),
    Set(PricingRuleSet),
}

impl Default for RulesPayload {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl RulesPayload {
    pub(crate) fn into_rule_set(self) -> PricingRuleSet {
        match self {
            RulesPayload::List(rules) => PricingRuleSet::new(rules),
            RulesPayload::Set(set) => set,
        }
    }
}

pub(crate) fn load_invoice(path: &Path) -> Result<Invoice, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn load_rules(path: &Path) -> Result<PricingRuleSet, AppError> {
    let raw = fs::read_to_string(path)?;
    let payload: RulesPayload = serde_json::from_str(&raw)?;
    Ok(payload.into_rule_set())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rules_accept_bare_list_and_rule_set() {
        let list: RulesPayload =
            serde_json::from_value(json!([{ "flat_fee": 10 }])).expect("list parses");
        assert_eq!(list.into_rule_set().rules.len(), 1);

        let set: RulesPayload = serde_json::from_value(json!({
            "rules": [{ "flat_fee": 10 }, { "unit_price": 4 }],
            "notes": "two clauses"
        }))
        .expect("set parses");
        let set = set.into_rule_set();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.notes.as_deref(), Some("two clauses"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_invoice(Path::new("does/not/exist.json")).expect_err("file is missing");
        assert!(matches!(err, AppError::Io(_)));
    }
}
