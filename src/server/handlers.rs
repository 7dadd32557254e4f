//! HTTP request handlers

use super::error::{HtmlError, Result, ServerError};
use super::pages;
use super::state::AppState;
use crate::data::{FeatureSchema, PatientRecord};
use crate::inference::PredictionResult;
use axum::{
    extract::{rejection::JsonRejection, Form, State},
    response::Html,
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Run a prediction off the async runtime; the first call reads the artifact
async fn run_prediction(
    state: &Arc<AppState>,
    record: PatientRecord,
) -> Result<PredictionResult> {
    let predictor = Arc::clone(&state.predictor);
    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || predictor.predict(&record)).await??;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        outputs = result.predictions.len(),
        "Prediction served"
    );
    Ok(result)
}

/// Schema for rendering; may read the artifact, so it runs off the async runtime
async fn current_schema(state: &Arc<AppState>) -> Result<(FeatureSchema, bool)> {
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || state.schema()).await?)
}

pub async fn serve_index(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, HtmlError> {
    let (schema, ready) = current_schema(&state).await?;
    Ok(Html(pages::index_page(&schema, ready)))
}

/// Browser form submission; errors come back as HTML pages
pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> std::result::Result<Html<String>, HtmlError> {
    let record: PatientRecord = fields.into_iter().map(|(k, v)| (k, v.into())).collect();
    let result = run_prediction(&state, record).await?;
    // the pipeline is loaded by now, so this is a cheap clone
    let schema = state.predictor.schema()?;
    Ok(Html(pages::result_page(&schema, &result)))
}

/// JSON prediction; body that does not parse as a record is a 400 with a JSON error
pub async fn predict_json(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<PatientRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(record) = body.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
    Ok(Json(run_prediction(&state, record).await?))
}

/// Level labels and colours of every disease
pub async fn risk_info(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let (schema, _) = current_schema(&state).await?;
    let targets: serde_json::Map<String, Value> = schema
        .targets
        .iter()
        .map(|t| {
            let levels: serde_json::Map<String, Value> = t
                .levels
                .iter()
                .map(|(class, level)| {
                    (class.to_string(), json!({ "label": level.label, "color": level.color }))
                })
                .collect();
            (t.name.clone(), Value::Object(levels))
        })
        .collect();
    Ok(Json(json!({ "schema": schema.name, "targets": targets })))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model_state": state.predictor.state(),
        "uptime_secs": uptime.num_seconds(),
    }))
}
