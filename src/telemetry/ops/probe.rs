use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Probe;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Complete }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Complete => "complete",
    }}
    fn span(&self) -> Span { match self {
        Phase::Complete => info_span!("complete"),
    }}
}

impl OpMarker for Probe {
    const NAME: &'static str = "probe";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("probe") }
}
