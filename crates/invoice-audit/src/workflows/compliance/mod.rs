//! Invoice pricing compliance: rule matching, tolerance checks, violation explanations,
//! and invoice-level risk scoring, plus the retrieval and persistence seams around them.

pub mod domain;
pub mod evaluator;
pub mod explainer;
pub mod intake;
pub mod matcher;
pub mod ports;
pub mod pricing;
pub mod report;
pub mod retrieval;
pub mod risk;
pub mod service;
pub mod tolerance;

#[cfg(test)]
mod tests;

pub use domain::{
    Invoice, LineItem, Numeric, PricingRule, PricingRuleSet, DEFAULT_VIOLATION_TYPE,
};
pub use evaluator::{
    ComplianceEvaluator, EvaluationSummary, InvoiceEvaluation, LineItemDiagnostic,
    LineItemOutcome, SkipReason,
};
pub use explainer::{
    ActualValue, ContractRequirement, ExpectedValue, Violation, ViolationReasoning,
};
pub use intake::{prepare_line_items, LineItemSource};
pub use matcher::{match_rule, MatchTier, RuleMatch};
pub use ports::{
    ContractIndex, ContractQuery, ExtractionError, InvoiceStore, PendingInvoice,
    QueryEmbedder, RetrievalError, RuleExtractor, StoreError,
};
pub use report::{
    write_violations_csv, AnalysisFailure, BulkAnalysis, ComplianceReport, ExplicitAnalysis,
    ReportStatus,
};
pub use retrieval::{ClauseReference, ContextSource, ContractContext, ContractMatch};
pub use service::{ComplianceService, ComplianceServiceError, ServiceSettings};
pub use tolerance::{check_tolerance, ToleranceCheck};
