use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;

use crate::config::{AppConfig, IngestConfig};
use crate::enrich::Enricher;
use crate::error::{EnrichmentError, Error};
use crate::llm::openai::OpenAiClient;
use crate::reddit::types::TimeWindow;
use crate::reddit::{ContentSource, RedditClient};
use crate::store::{PgStore, Store};
use crate::telemetry::{self};
use crate::telemetry::ops::ingest::Phase as IngestPhase;

pub mod enumerate;
pub mod orchestrator;
pub mod pipeline;
pub mod report;

use enumerate::Source;
use orchestrator::Concurrency;

/// Collaborators shared by every pipeline of a run.
#[derive(Clone)]
pub struct PipelineDeps {
    pub source: Arc<dyn ContentSource>,
    pub store: Arc<dyn Store>,
    pub enricher: Option<Arc<Enricher>>,
}

impl PipelineDeps {
    /// Builds the production clients. The enricher exists only when an
    /// enrichment step is enabled and an API key is configured.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn Store>) -> Result<Self, Error> {
        let source: Arc<dyn ContentSource> = Arc::new(RedditClient::new(cfg.reddit.clone())?);
        let wants_llm = cfg.ingest.summarize || cfg.ingest.classify;
        let enricher = if wants_llm && cfg.openai.api_key.is_some() {
            let client = OpenAiClient::new(cfg.openai.clone()).map_err(EnrichmentError::from)?;
            Some(Arc::new(Enricher::new(Arc::new(client))))
        } else {
            None
        };
        Ok(Self { source, store, enricher })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineOptions {
    pub post_limit: u32,
    pub window: TimeWindow,
    pub comment_limit: u32,
    pub summarize: bool,
    pub classify: bool,
}

impl From<&IngestConfig> for PipelineOptions {
    fn from(cfg: &IngestConfig) -> Self {
        Self {
            post_limit: cfg.post_limit,
            window: cfg.window,
            comment_limit: cfg.comment_limit,
            summarize: cfg.summarize,
            classify: cfg.classify,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

#[derive(Args)]
pub struct IngestCmd {
    #[arg(long, default_value_t=false)] pub apply: bool,
    /// Posts per subreddit, 1..=100 (defaults to NICHETRACK_POST_LIMIT)
    #[arg(long)] pub limit: Option<u32>,
    #[arg(long, value_enum)] pub window: Option<TimeWindow>,
    /// Run pipelines one after another instead of concurrently
    #[arg(long)] pub sequential: bool,
    #[arg(long, default_value_t=10)] pub plan_limit: usize,
}

#[derive(Serialize)]
struct IngestPlan<'a> {
    sources: usize,
    mode: Concurrency,
    options: &'a PipelineOptions,
    sample_sources: &'a [Source],
}

pub async fn run(pool: &PgPool, cfg: &AppConfig, args: IngestCmd) -> Result<()> {
    let log = telemetry::ingest();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("limit", format!("{:?}", args.limit)),
        ("window", format!("{:?}", args.window)),
        ("sequential", args.sequential.to_string()),
    ]).entered();

    let mut opts = PipelineOptions::from(&cfg.ingest);
    if let Some(limit) = args.limit {
        anyhow::ensure!((1..=100).contains(&limit), "--limit must be between 1 and 100, got {limit}");
        opts.post_limit = limit;
    }
    if let Some(window) = args.window {
        opts.window = window;
    }
    let mode = if args.sequential { Concurrency::Sequential } else { cfg.ingest.concurrency };
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));

    if !args.apply {
        let sources = { let _s = log.span(&IngestPhase::Enumerate).entered(); enumerate::active_sources(store.as_ref()).await };
        if telemetry::config::json_mode() {
            let sample = &sources[..sources.len().min(args.plan_limit)];
            log.plan(&IngestPlan { sources: sources.len(), mode, options: &opts, sample_sources: sample })?;
        } else {
            log.info(format!(
                "📝 Ingest plan — sources={} mode={} limit={} window={} summarize={} classify={}",
                sources.len(), mode, opts.post_limit, opts.window, opts.summarize, opts.classify
            ));
            for s in sources.iter().take(args.plan_limit) { log.info(format!("  user={} r/{}", s.user_id, s.subreddit)); }
            if sources.len() > args.plan_limit { log.info(format!("  ... ({} more)", sources.len() - args.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    cfg.pipeline_credentials().context("credential check failed; nothing was ingested")?;
    let deps = PipelineDeps::from_config(cfg, store).context("building ingest clients")?;
    let sources = { let _s = log.span(&IngestPhase::Enumerate).entered(); enumerate::active_sources(deps.store.as_ref()).await };
    let report = orchestrator::run(&deps, &sources, &opts, mode).await;

    if telemetry::config::json_mode() {
        log.result(&report)?;
    }
    Ok(())
}
