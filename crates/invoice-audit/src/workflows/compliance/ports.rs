use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Invoice, PricingRuleSet};
use super::report::{ComplianceReport, ReportStatus};
use super::retrieval::ContractMatch;

/// Invoice awaiting a compliance pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvoice {
    pub db_id: i64,
    pub invoice_id: Option<String>,
}

/// Storage abstraction over invoices and compliance reports.
pub trait InvoiceStore: Send + Sync {
    fn fetch_invoice(&self, db_id: i64) -> Result<Option<Invoice>, StoreError>;
    fn pending_invoices(&self, limit: usize) -> Result<Vec<PendingInvoice>, StoreError>;
    fn save_report(
        &self,
        report: &ComplianceReport,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    fn update_compliance_metadata(
        &self,
        db_id: i64,
        status: ReportStatus,
        risk_score: Option<Decimal>,
    ) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Turns a free-text query into an embedding vector.
pub trait QueryEmbedder: Send + Sync {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Similarity search parameters handed to the contract index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractQuery<'a> {
    pub vector: &'a [f32],
    pub limit: usize,
    pub similarity_threshold: f32,
    pub vendor_name: Option<&'a str>,
}

/// Nearest-neighbour search over vectorized contract text.
pub trait ContractIndex: Send + Sync {
    fn search(&self, query: &ContractQuery<'_>) -> Result<Vec<ContractMatch>, RetrievalError>;
}

/// Error raised while embedding the query or searching the index.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("contract search failed: {0}")]
    Search(String),
}

/// Extracts structured pricing rules from contract context.
pub trait RuleExtractor: Send + Sync {
    fn extract_rules(
        &self,
        invoice: &Invoice,
        contexts: &[String],
    ) -> Result<PricingRuleSet, ExtractionError>;
}

/// Rule extraction failure; the service degrades it to an empty rule set.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("rule extraction unavailable: {0}")]
    Unavailable(String),
}
