use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::Instrument;

use crate::error::{ConfigError, Error};
use crate::ingest::report::RunReport;
use crate::ingest::{enumerate, orchestrator};
use crate::llm::openai::RawCompletion;
use crate::telemetry;
use crate::telemetry::ops::serve::Phase as ServePhase;

use super::state::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /api/ingest-trends
///
/// Credentials are checked before the store is touched; per-source failures
/// are part of the 200 report.
pub async fn ingest_trends(State(state): State<AppState>) -> Result<Json<RunReport>, Error> {
    let log = telemetry::serve();
    async move {
        state.config.pipeline_credentials()?;
        let sources = enumerate::active_sources(state.deps.store.as_ref()).await;
        let report = orchestrator::run(&state.deps, &sources, &state.options, state.config.ingest.concurrency).await;
        Ok::<_, Error>(Json(report))
    }
    .instrument(log.span(&ServePhase::Trigger))
    .await
}

/// GET /api/llm-probe
pub async fn llm_probe(State(state): State<AppState>) -> Result<Json<RawCompletion>, Error> {
    let log = telemetry::serve();
    let enricher = state
        .deps
        .enricher
        .clone()
        .ok_or(ConfigError::Missing { key: "OPENAI_API_KEY" })?;
    let raw = enricher.probe().instrument(log.span(&ServePhase::Probe)).await?;
    log.info_kv("🏴‍☠️ probe", [("status", raw.status.to_string())]);
    Ok(Json(raw))
}
