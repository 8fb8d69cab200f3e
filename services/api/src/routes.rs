use crate::infra::{AppState, RulesPayload};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use invoice_audit::workflows::compliance::{
    prepare_line_items, ComplianceEvaluator, Invoice, InvoiceEvaluation, LineItemSource,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    pub(crate) invoice: Invoice,
    #[serde(default)]
    pub(crate) rules: RulesPayload,
}

#[derive(Debug, Serialize)]
pub(crate) struct EvaluateResponse {
    pub(crate) invoice_id: String,
    pub(crate) line_item_source: LineItemSource,
    #[serde(flatten)]
    pub(crate) evaluation: InvoiceEvaluation,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/compliance/evaluate", post(evaluate_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn evaluate_endpoint(
    Json(payload): Json<EvaluateRequest>,
) -> Json<EvaluateResponse> {
    let EvaluateRequest { invoice, rules } = payload;
    let rules = rules.into_rule_set();

    let (line_items, line_item_source) = prepare_line_items(&invoice);
    let evaluation = ComplianceEvaluator::new().evaluate(&invoice, &line_items, &rules.rules);

    info!(
        invoice_id = %invoice.invoice_id,
        violations = evaluation.evaluation_summary.violations_detected,
        "invoice evaluated over http"
    );

    Json(EvaluateResponse {
        invoice_id: invoice.invoice_id,
        line_item_source,
        evaluation,
    })
}
