use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::workflows::compliance::domain::{Invoice, LineItem, Numeric, PricingRule, PricingRuleSet};
use crate::workflows::compliance::ports::{
    ContractIndex, ContractQuery, ExtractionError, InvoiceStore, PendingInvoice, QueryEmbedder,
    RetrievalError, RuleExtractor, StoreError,
};
use crate::workflows::compliance::report::{ComplianceReport, ReportStatus};
use crate::workflows::compliance::retrieval::ContractMatch;
use crate::workflows::compliance::service::{ComplianceService, ServiceSettings};

pub(super) fn amount(value: i64, scale: u32) -> Decimal {
    Decimal::new(value, scale)
}

pub(super) fn unit_price_rule(price: i64) -> PricingRule {
    PricingRule {
        unit_price: Some(Numeric::from(price)),
        ..PricingRule::default()
    }
}

pub(super) fn keyword_rule(keywords: &[&str], unit_price: i64) -> PricingRule {
    PricingRule {
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        ..unit_price_rule(unit_price)
    }
}

pub(super) fn cap_rule(cap: i64) -> PricingRule {
    PricingRule {
        price_cap: Some(Numeric::from(cap)),
        ..PricingRule::default()
    }
}

pub(super) fn invoice(subtotal: Option<i64>, line_items: Vec<LineItem>) -> Invoice {
    Invoice {
        invoice_id: "INV-2041".to_string(),
        db_id: Some(2041),
        subtotal_amount: subtotal.map(Numeric::from),
        tax_amount: None,
        seller_name: Some("Northwind Logistics Inc.".to_string()),
        summary: Some("Freight and handling for March".to_string()),
        line_items,
    }
}

pub(super) fn freight_rules() -> Vec<PricingRule> {
    vec![
        PricingRule {
            service_code: Some("FRT-01".to_string()),
            keywords: vec!["freight".to_string(), "pallet".to_string()],
            unit_price: Some(Numeric::from("45.00")),
            tolerance_amount: Some(Numeric::from(5i64)),
            clause_reference: Some("Section 4.2".to_string()),
            notes: Some("Pallet freight billed at $45.00 per pallet".to_string()),
            ..PricingRule::default()
        },
        PricingRule {
            keywords: vec!["fuel surcharge".to_string()],
            flat_fee: Some(Numeric::from(120i64)),
            violation_type: Some("Surcharge Above Contract".to_string()),
            clause_reference: Some("Section 4.5".to_string()),
            ..PricingRule::default()
        },
    ]
}

pub(super) fn freight_invoice() -> Invoice {
    invoice(
        Some(720),
        vec![
            LineItem::new("L1", "Pallet freight Chicago to Denver")
                .with_service_code("frt-01")
                .with_quantity(10i64)
                .with_unit_price(50i64)
                .with_total_price(500i64)
                .with_metadata(json!({
                    "pdf_location": {
                        "pageNumber": 1,
                        "bbox": { "left": 0.1, "top": 0.4, "right": 0.9, "bottom": 0.45 }
                    }
                })),
            LineItem::new("L2", "Fuel surcharge").with_total_price(180i64),
            LineItem::new("L3", "Dock handling").with_total_price(40i64),
        ],
    )
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) invoices: Mutex<HashMap<i64, Invoice>>,
    pub(super) pending: Mutex<Vec<PendingInvoice>>,
    pub(super) reports: Mutex<Vec<(ComplianceReport, DateTime<Utc>)>>,
    pub(super) metadata: Mutex<HashMap<i64, (ReportStatus, Option<Decimal>)>>,
    pub(super) offline: bool,
}

impl MemoryStore {
    pub(super) fn with_invoice(self, db_id: i64, invoice: Invoice) -> Self {
        self.invoices
            .lock()
            .expect("store mutex poisoned")
            .insert(db_id, invoice.clone());
        self.pending
            .lock()
            .expect("store mutex poisoned")
            .push(PendingInvoice {
                db_id,
                invoice_id: Some(invoice.invoice_id),
            });
        self
    }

    pub(super) fn with_pending(self, db_id: i64) -> Self {
        self.pending
            .lock()
            .expect("store mutex poisoned")
            .push(PendingInvoice {
                db_id,
                invoice_id: None,
            });
        self
    }
}

impl InvoiceStore for MemoryStore {
    fn fetch_invoice(&self, db_id: i64) -> Result<Option<Invoice>, StoreError> {
        let guard = self.invoices.lock().expect("store mutex poisoned");
        Ok(guard.get(&db_id).cloned())
    }

    fn pending_invoices(&self, limit: usize) -> Result<Vec<PendingInvoice>, StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        let guard = self.pending.lock().expect("store mutex poisoned");
        Ok(guard.iter().take(limit).cloned().collect())
    }

    fn save_report(
        &self,
        report: &ComplianceReport,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut guard = self.reports.lock().expect("store mutex poisoned");
        guard.push((report.clone(), next_run_at));
        Ok(())
    }

    fn update_compliance_metadata(
        &self,
        db_id: i64,
        status: ReportStatus,
        risk_score: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let mut guard = self.metadata.lock().expect("store mutex poisoned");
        guard.insert(db_id, (status, risk_score));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingEmbedder {
    pub(super) queries: Mutex<Vec<String>>,
    pub(super) fail: bool,
}

impl QueryEmbedder for RecordingEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        if self.fail {
            return Err(RetrievalError::Embedding("quota exhausted".to_string()));
        }
        self.queries
            .lock()
            .expect("embedder mutex poisoned")
            .push(text.to_string());
        Ok(vec![0.25, 0.5, 0.25])
    }
}

#[derive(Default)]
pub(super) struct StaticIndex {
    pub(super) matches: Vec<ContractMatch>,
    pub(super) limits: Mutex<Vec<(usize, Option<String>)>>,
    pub(super) offline: bool,
}

impl ContractIndex for StaticIndex {
    fn search(&self, query: &ContractQuery<'_>) -> Result<Vec<ContractMatch>, RetrievalError> {
        if self.offline {
            return Err(RetrievalError::Search("index offline".to_string()));
        }
        self.limits
            .lock()
            .expect("index mutex poisoned")
            .push((query.limit, query.vendor_name.map(str::to_string)));
        Ok(self.matches.iter().take(query.limit).cloned().collect())
    }
}

pub(super) struct StaticExtractor {
    pub(super) rules: Option<PricingRuleSet>,
    pub(super) contexts: Mutex<Vec<Vec<String>>>,
}

impl StaticExtractor {
    pub(super) fn returning(rules: Vec<PricingRule>) -> Self {
        Self {
            rules: Some(PricingRuleSet::new(rules)),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            rules: None,
            contexts: Mutex::new(Vec::new()),
        }
    }
}

impl RuleExtractor for StaticExtractor {
    fn extract_rules(
        &self,
        _invoice: &Invoice,
        contexts: &[String],
    ) -> Result<PricingRuleSet, ExtractionError> {
        self.contexts
            .lock()
            .expect("extractor mutex poisoned")
            .push(contexts.to_vec());
        self.rules
            .clone()
            .ok_or_else(|| ExtractionError::Unavailable("model timed out".to_string()))
    }
}

pub(super) fn northwind_contract() -> ContractMatch {
    ContractMatch {
        contract_id: Some("MSA-NW-2024".to_string()),
        vendor_name: Some("Northwind Logistics".to_string()),
        text: Some("Master services agreement between Acme and Northwind Logistics.".to_string()),
        clauses: json!([
            {
                "clause_id": "4.2",
                "clause_type": "Pricing",
                "section_title": "Freight Rates",
                "clause_text": "Pallet freight shall be billed at $45.00 per pallet."
            },
            {
                "clause_id": "9.1",
                "clause_type": "termination",
                "clause_text": "Either party may terminate with 30 days notice."
            }
        ]),
        service_types: json!("[\"freight\", \"handling\"]"),
        similarity: Some(Numeric::from(0.82)),
        ..ContractMatch::default()
    }
}

pub(super) type TestService =
    ComplianceService<MemoryStore, RecordingEmbedder, StaticIndex, StaticExtractor>;

pub(super) fn build_service(
    store: MemoryStore,
    matches: Vec<ContractMatch>,
    extractor: StaticExtractor,
) -> (
    TestService,
    Arc<MemoryStore>,
    Arc<RecordingEmbedder>,
    Arc<StaticExtractor>,
) {
    let store = Arc::new(store);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = Arc::new(StaticIndex {
        matches,
        ..StaticIndex::default()
    });
    let extractor = Arc::new(extractor);
    let service = ComplianceService::new(
        store.clone(),
        embedder.clone(),
        index,
        extractor.clone(),
        ServiceSettings::default(),
    );
    (service, store, embedder, extractor)
}
