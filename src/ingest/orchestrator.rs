use std::any::Any;
use std::fmt;
use std::str::FromStr;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::error::ItemError;
use crate::telemetry;
use crate::telemetry::ops::ingest::Phase as IngestPhase;

use super::enumerate::Source;
use super::pipeline::{self, Processed};
use super::report::{RunReport, SourceOutcome};
use super::{PipelineDeps, PipelineOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Concurrency {
    #[default]
    Concurrent,
    Sequential,
}

impl Concurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Concurrency::Concurrent => "concurrent",
            Concurrency::Sequential => "sequential",
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Concurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent" => Ok(Concurrency::Concurrent),
            "sequential" => Ok(Concurrency::Sequential),
            other => Err(format!("unknown concurrency mode {other:?}")),
        }
    }
}

/// Run one pipeline per source and merge the outcomes.
///
/// Each pipeline is its own task so a panic stays inside it. Outcomes are
/// matched to sources by position, never by completion order.
pub async fn run(deps: &PipelineDeps, sources: &[Source], opts: &PipelineOptions, mode: Concurrency) -> RunReport {
    let log = telemetry::ingest();
    log.info_kv("🚀 ingest run", [("sources", sources.len().to_string()), ("mode", mode.to_string())]);

    let mut results = Vec::with_capacity(sources.len());
    match mode {
        Concurrency::Concurrent => {
            let handles: Vec<_> = sources.iter().map(|s| spawn_pipeline(deps, s, opts)).collect();
            results.extend(join_all(handles).await);
        }
        Concurrency::Sequential => {
            for s in sources {
                results.push(spawn_pipeline(deps, s, opts).await);
            }
        }
    }

    let outcomes: Vec<SourceOutcome> = sources
        .iter()
        .zip(results)
        .map(|(source, joined)| {
            let outcome = SourceOutcome::from_result(source, flatten(joined));
            log.source_outcome(&outcome);
            outcome
        })
        .collect();

    let report = RunReport::from_outcomes(outcomes);
    log.totals(&report);
    report
}

fn spawn_pipeline(deps: &PipelineDeps, source: &Source, opts: &PipelineOptions) -> JoinHandle<Result<Processed, ItemError>> {
    let span = telemetry::ingest().span_kv(
        &IngestPhase::Source,
        [("user_id", source.user_id.clone()), ("subreddit", source.subreddit.clone())],
    );
    let (deps, source, opts) = (deps.clone(), source.clone(), opts.clone());
    tokio::spawn(async move { pipeline::process_source(&deps, &source, &opts).await }.instrument(span))
}

fn flatten(joined: Result<Result<Processed, ItemError>, JoinError>) -> Result<Processed, ItemError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ItemError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(ItemError::Panicked(e.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
