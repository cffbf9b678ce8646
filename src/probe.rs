use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::enrich::Enricher;
use crate::llm::openai::OpenAiClient;
use crate::telemetry::{self};
use crate::telemetry::ops::probe::Phase as ProbePhase;

/// Sends one fixed prompt and prints the reply exactly as received.
#[derive(Args)]
pub struct ProbeCmd {}

pub async fn run(cfg: &AppConfig, _args: ProbeCmd) -> Result<()> {
    let log = telemetry::probe();
    let client = OpenAiClient::new(cfg.openai.clone()).context("OpenAI client is not configured")?;
    let enricher = Enricher::new(Arc::new(client));

    let raw = enricher
        .probe()
        .instrument(log.span_kv(&ProbePhase::Complete, [("model", cfg.openai.default_model.clone())]))
        .await
        .context("probe request failed")?;

    log.info(format!("🏴‍☠️ status={} content_type={:?}", raw.status, raw.content_type));
    log.info(&raw.body);
    if telemetry::config::json_mode() {
        log.result(&raw)?;
    }
    Ok(())
}
