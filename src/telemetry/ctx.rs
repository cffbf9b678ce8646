use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{info, debug, warn, Span};

use crate::ingest::report::{RunReport, SourceOutcome};
use crate::output::config::{OutputConfig, OutputFormat};
use crate::output::types::Envelope;
use crate::output::Emitter;

use super::config;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    pub(crate) json: bool,
    pub(crate) _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub(crate) fn new() -> Self {
        LogCtx { json: config::logs_are_json(), _marker: PhantomData }
    }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            debug!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            debug!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn debug(&self, msg: impl AsRef<str>) { if self.json { debug!(op = %self.op_name(), "{}", msg.as_ref()); } else { debug!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{} {}", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> {
        let env = Envelope::plan(self.op_name(), plan)?;
        emitter().emit(&env)?;
        Ok(())
    }

    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> {
        let env = Envelope::result(self.op_name(), result)?;
        emitter().emit(&env)?;
        Ok(())
    }
}

// --json wins over NICHETRACK_OUTPUT_FORMAT
fn emitter() -> Emitter {
    let mut cfg = OutputConfig::from_env();
    if config::json_mode() {
        cfg.format = OutputFormat::Json;
    }
    Emitter::from_env(cfg)
}

// Ingest-specific helpers remain available on the typed context
impl LogCtx<crate::telemetry::ops::ingest::Ingest> {
    pub fn source_outcome(&self, outcome: &SourceOutcome) {
        match outcome {
            SourceOutcome::Processed { user_id, subreddit, item_ids, summarized, errors } => {
                if self.json { info!(op = %self.op_name(), user_id = %user_id, subreddit = %subreddit, items = item_ids.len(), summarized, post_errors = errors.len(), "source_processed"); }
                else { info!("✅ r/{} (user {}) — items={} summarized={} post_errors={}", subreddit, user_id, item_ids.len(), summarized, errors.len()); }
            }
            SourceOutcome::Failed { user_id, subreddit, kind, reason } => {
                if self.json { warn!(op = %self.op_name(), user_id = %user_id, subreddit = %subreddit, kind = %kind, reason = %reason, "source_failed"); }
                else { warn!("❌ r/{} (user {}) — {}: {}", subreddit, user_id, kind, reason); }
            }
        }
    }

    pub fn totals(&self, report: &RunReport) {
        let t = &report.totals;
        if self.json { info!(op = %self.op_name(), sources = t.sources, processed = t.processed, failed = t.failed, items = t.items, post_errors = t.post_errors, "ingest_totals"); }
        else { info!("📊 Ingest totals — sources={} processed={} failed={} items={} post_errors={}", t.sources, t.processed, t.failed, t.items, t.post_errors); }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
