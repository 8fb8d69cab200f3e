use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Invoice, LineItem, PricingRule};
use super::explainer::{build_violation, Violation};
use super::matcher::{match_rule, MatchTier};
use super::pricing::actual_price;
use super::risk::risk_score;
use super::tolerance::check_tolerance;

/// Counts reported alongside the violation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub line_items_evaluated: usize,
    pub rules_evaluated: usize,
    pub violations_detected: usize,
}

/// Why a line item dropped out before a tolerance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnresolvablePrice,
    NoRuleMatched,
    UnresolvableExpectedPrice,
}

/// Terminal state of a single line item.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemOutcome {
    Compliant { rule_index: usize, tier: MatchTier },
    Violation { rule_index: usize, tier: MatchTier, violation: Box<Violation> },
    Skipped(SkipReason),
}

/// Per-line diagnostic handed back to the caller instead of global log state.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDiagnostic {
    pub line_id: String,
    pub outcome: LineItemOutcome,
}

/// Result of evaluating one invoice against its pricing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceEvaluation {
    pub violations: Vec<Violation>,
    pub evaluation_summary: EvaluationSummary,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub risk_assessment_score: Option<Decimal>,
    #[serde(skip)]
    pub diagnostics: Vec<LineItemDiagnostic>,
}

/// Stateless evaluator running match, tolerance, and explanation over every line item.
///
/// Holds nothing between calls, so one instance can be shared across threads evaluating
/// different invoices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the invoice's own stored line items.
    pub fn evaluate_invoice(&self, invoice: &Invoice, rules: &[PricingRule]) -> InvoiceEvaluation {
        self.evaluate(invoice, &invoice.line_items, rules)
    }

    /// Evaluate `line_items` in input order, then score the invoice.
    pub fn evaluate(
        &self,
        invoice: &Invoice,
        line_items: &[LineItem],
        rules: &[PricingRule],
    ) -> InvoiceEvaluation {
        let mut violations = Vec::new();
        let mut diagnostics = Vec::with_capacity(line_items.len());

        for item in line_items {
            let outcome = self.evaluate_line_item(item, rules);
            if let LineItemOutcome::Violation { violation, .. } = &outcome {
                violations.push(violation.as_ref().clone());
            }
            diagnostics.push(LineItemDiagnostic {
                line_id: item.line_id.clone(),
                outcome,
            });
        }

        let evaluation_summary = EvaluationSummary {
            line_items_evaluated: line_items.len(),
            rules_evaluated: rules.len(),
            violations_detected: violations.len(),
        };
        let risk_assessment_score = risk_score(invoice, line_items, &violations);

        debug!(
            invoice_id = %invoice.invoice_id,
            line_items = evaluation_summary.line_items_evaluated,
            rules = evaluation_summary.rules_evaluated,
            violations = evaluation_summary.violations_detected,
            risk_score = ?risk_assessment_score,
            "invoice evaluated"
        );

        InvoiceEvaluation {
            violations,
            evaluation_summary,
            risk_assessment_score,
            diagnostics,
        }
    }

    /// Walk one line item to its terminal state.
    pub fn evaluate_line_item(&self, item: &LineItem, rules: &[PricingRule]) -> LineItemOutcome {
        if actual_price(item).is_none() {
            debug!(line_id = %item.line_id, "skipping line item without a resolvable price");
            return LineItemOutcome::Skipped(SkipReason::UnresolvablePrice);
        }

        let Some(matched) = match_rule(item, rules) else {
            debug!(line_id = %item.line_id, "no pricing rule applies");
            return LineItemOutcome::Skipped(SkipReason::NoRuleMatched);
        };
        debug!(line_id = %item.line_id, rule = matched.index, tier = ?matched.tier, "matched pricing rule");

        let Some(check) = check_tolerance(item, matched.rule) else {
            return LineItemOutcome::Skipped(SkipReason::UnresolvableExpectedPrice);
        };

        if !check.is_violation {
            return LineItemOutcome::Compliant {
                rule_index: matched.index,
                tier: matched.tier,
            };
        }

        let violation = build_violation(item, matched.rule, &check);
        debug!(
            line_id = %item.line_id,
            violation_type = %violation.violation_type,
            difference = %violation.difference,
            "pricing violation detected"
        );

        LineItemOutcome::Violation {
            rule_index: matched.index,
            tier: matched.tier,
            violation: Box::new(violation),
        }
    }
}
