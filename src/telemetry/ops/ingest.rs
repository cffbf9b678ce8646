use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Ingest;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Enumerate, Source, FetchPosts, WriteItem, FetchComments, Summarize, Classify }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Enumerate => "enumerate",
        Phase::Source => "source",
        Phase::FetchPosts => "fetch_posts",
        Phase::WriteItem => "write_item",
        Phase::FetchComments => "fetch_comments",
        Phase::Summarize => "summarize",
        Phase::Classify => "classify",
    }}
    fn span(&self) -> Span { match self {
        Phase::Enumerate => info_span!("enumerate"),
        Phase::Source => info_span!("source"),
        Phase::FetchPosts => info_span!("fetch_posts"),
        Phase::WriteItem => info_span!("write_item"),
        Phase::FetchComments => info_span!("fetch_comments"),
        Phase::Summarize => info_span!("summarize"),
        Phase::Classify => info_span!("classify"),
    }}
}

impl OpMarker for Ingest {
    const NAME: &'static str = "ingest";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("ingest") }
}
