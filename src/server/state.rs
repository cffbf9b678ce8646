use std::sync::Arc;

use crate::config::AppConfig;
use crate::ingest::{PipelineDeps, PipelineOptions};

/// Shared by every handler; cloning is a handful of `Arc` bumps.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub deps: PipelineDeps,
    pub options: PipelineOptions,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, deps: PipelineDeps) -> Self {
        let options = PipelineOptions::from(&config.ingest);
        Self { config, deps, options }
    }
}
