use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::domain::PricingRuleSet;
use super::evaluator::ComplianceEvaluator;
use super::intake::prepare_line_items;
use super::ports::{
    ContractIndex, ContractQuery, InvoiceStore, QueryEmbedder, RetrievalError, RuleExtractor,
    StoreError,
};
use super::report::{
    AnalysisFailure, BulkAnalysis, ComplianceReport, ExplicitAnalysis, ReportStatus,
};
use super::retrieval::{build_contract_query, select_contract_context};
use crate::config::AuditConfig;

/// Knobs for retrieval and scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub clause_limit: usize,
    pub similarity_threshold: f32,
    pub next_run_interval_hours: u32,
    pub bulk_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            clause_limit: 5,
            similarity_threshold: 0.3,
            next_run_interval_hours: 4,
            bulk_limit: 200,
        }
    }
}

impl From<&AuditConfig> for ServiceSettings {
    fn from(config: &AuditConfig) -> Self {
        Self {
            clause_limit: config.clause_limit,
            similarity_threshold: config.similarity_threshold,
            next_run_interval_hours: config.next_run_interval_hours,
            bulk_limit: config.bulk_limit,
        }
    }
}

/// Service composing retrieval, rule extraction, evaluation, and persistence.
pub struct ComplianceService<S, E, I, X> {
    store: Arc<S>,
    embedder: Arc<E>,
    index: Arc<I>,
    extractor: Arc<X>,
    evaluator: ComplianceEvaluator,
    settings: ServiceSettings,
}

impl<S, E, I, X> ComplianceService<S, E, I, X>
where
    S: InvoiceStore + 'static,
    E: QueryEmbedder + 'static,
    I: ContractIndex + 'static,
    X: RuleExtractor + 'static,
{
    pub fn new(
        store: Arc<S>,
        embedder: Arc<E>,
        index: Arc<I>,
        extractor: Arc<X>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            extractor,
            evaluator: ComplianceEvaluator::new(),
            settings,
        }
    }

    /// Run the full compliance pass for one stored invoice and persist the report.
    pub fn analyze_invoice(&self, db_id: i64) -> Result<ComplianceReport, ComplianceServiceError> {
        let invoice = self
            .store
            .fetch_invoice(db_id)?
            .ok_or(ComplianceServiceError::InvoiceNotFound(db_id))?;

        let (line_items, line_item_source) = prepare_line_items(&invoice);

        let query = build_contract_query(&invoice, &line_items);
        info!(invoice_id = %invoice.invoice_id, %query, "searching contract clauses");
        let vector = self.embedder.embed_query(&query)?;
        let matches = self.index.search(&ContractQuery {
            vector: &vector,
            limit: self.settings.clause_limit,
            similarity_threshold: self.settings.similarity_threshold,
            vendor_name: invoice.seller_name.as_deref(),
        })?;

        let context = select_contract_context(invoice.seller_name.as_deref(), &matches);
        if context.contexts.is_empty() {
            warn!(invoice_id = %invoice.invoice_id, "no contract clauses retrieved");
        }

        let pricing_rules = match self.extractor.extract_rules(&invoice, &context.contexts) {
            Ok(rules) => rules,
            Err(err) => {
                error!(invoice_id = %invoice.invoice_id, error = %err, "failed to extract pricing rules");
                PricingRuleSet::failed(err.to_string())
            }
        };

        let evaluation = self
            .evaluator
            .evaluate(&invoice, &line_items, &pricing_rules.rules);

        let processed_at = Utc::now();
        let next_run_at =
            processed_at + Duration::hours(i64::from(self.settings.next_run_interval_hours));

        let report = ComplianceReport {
            invoice_id: invoice.invoice_id.clone(),
            db_id: invoice.db_id.or(Some(db_id)),
            status: ReportStatus::Processed,
            processed_at,
            violations: evaluation.violations,
            evaluation_summary: evaluation.evaluation_summary,
            line_item_source,
            contract_clauses: context.references,
            pricing_rules,
            risk_assessment_score: evaluation.risk_assessment_score,
            next_run_scheduled_in_hours: self.settings.next_run_interval_hours,
        };

        self.store.save_report(&report, next_run_at)?;
        self.store.update_compliance_metadata(
            db_id,
            report.status,
            report.risk_assessment_score,
        )?;

        Ok(report)
    }

    /// Analyze every pending invoice; per-invoice failures are collected, not raised.
    pub fn analyze_pending(&self, limit: usize) -> Result<BulkAnalysis, ComplianceServiceError> {
        let pending = self.store.pending_invoices(limit)?;
        let mut reports = Vec::new();
        let mut errors = Vec::new();

        for invoice in &pending {
            match self.analyze_invoice(invoice.db_id) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(
                        invoice_db_id = invoice.db_id,
                        invoice_id = ?invoice.invoice_id,
                        error = %err,
                        "compliance analysis failed"
                    );
                    errors.push(AnalysisFailure {
                        invoice_db_id: invoice.db_id,
                        invoice_id: invoice.invoice_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let violations_detected = reports.iter().map(|report| report.violations.len()).sum();

        Ok(BulkAnalysis {
            status: ReportStatus::Processed,
            processed: reports.len(),
            failed: errors.len(),
            reports,
            errors,
            invoices_in_queue: pending.len(),
            violations_detected,
            next_run_scheduled_in_hours: self.settings.next_run_interval_hours,
        })
    }

    /// Drain the pending queue up to the configured bulk limit.
    pub fn analyze_queue(&self) -> Result<BulkAnalysis, ComplianceServiceError> {
        self.analyze_pending(self.settings.bulk_limit)
    }

    /// Analyze a caller-supplied list of invoice ids.
    pub fn analyze_explicit(&self, db_ids: &[i64]) -> ExplicitAnalysis {
        let mut reports = Vec::new();
        let mut errors = Vec::new();

        for &db_id in db_ids {
            match self.analyze_invoice(db_id) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(invoice_db_id = db_id, error = %err, "compliance analysis failed");
                    errors.push(AnalysisFailure {
                        invoice_db_id: db_id,
                        invoice_id: None,
                        error: err.to_string(),
                    });
                }
            }
        }

        ExplicitAnalysis {
            status: ReportStatus::Processed,
            processed: reports.len(),
            failed: errors.len(),
            reports,
            errors,
        }
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceServiceError {
    #[error("invoice with database id '{0}' not found")]
    InvoiceNotFound(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}
