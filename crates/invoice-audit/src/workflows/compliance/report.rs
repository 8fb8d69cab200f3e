use std::io;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::PricingRuleSet;
use super::evaluator::EvaluationSummary;
use super::explainer::{money, Violation};
use super::intake::LineItemSource;
use super::retrieval::ClauseReference;

/// Lifecycle label recorded on reports and invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Processed,
}

/// Per-invoice compliance report handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub invoice_id: String,
    pub db_id: Option<i64>,
    pub status: ReportStatus,
    pub processed_at: DateTime<Utc>,
    pub violations: Vec<Violation>,
    pub evaluation_summary: EvaluationSummary,
    pub line_item_source: LineItemSource,
    pub contract_clauses: Vec<ClauseReference>,
    pub pricing_rules: PricingRuleSet,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub risk_assessment_score: Option<Decimal>,
    pub next_run_scheduled_in_hours: u32,
}

/// Invoice that could not be analyzed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub invoice_db_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub error: String,
}

/// Outcome of draining the pending-invoice queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkAnalysis {
    pub status: ReportStatus,
    pub processed: usize,
    pub failed: usize,
    pub reports: Vec<ComplianceReport>,
    pub errors: Vec<AnalysisFailure>,
    pub invoices_in_queue: usize,
    pub violations_detected: usize,
    pub next_run_scheduled_in_hours: u32,
}

/// Outcome of analyzing a caller-supplied list of invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitAnalysis {
    pub status: ReportStatus,
    pub processed: usize,
    pub failed: usize,
    pub reports: Vec<ComplianceReport>,
    pub errors: Vec<AnalysisFailure>,
}

const CSV_HEADER: [&str; 7] = [
    "line_id",
    "violation_type",
    "expected_price",
    "actual_price",
    "difference",
    "clause_reference",
    "explanation",
];

/// Write violations as CSV for spreadsheet review.
pub fn write_violations_csv<W: io::Write>(
    violations: &[Violation],
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for violation in violations {
        writer.write_record([
            violation.line_id.as_str(),
            violation.violation_type.as_str(),
            plain_amount(violation.expected_price).as_str(),
            plain_amount(violation.actual_price).as_str(),
            plain_amount(violation.difference).as_str(),
            violation.clause_reference.as_deref().unwrap_or_default(),
            violation.reasoning.explanation.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn plain_amount(amount: Decimal) -> String {
    money(amount).trim_start_matches('$').to_string()
}
