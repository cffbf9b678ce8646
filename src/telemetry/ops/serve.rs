use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Serve;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Bind, Trigger, Probe }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Bind => "bind",
        Phase::Trigger => "trigger",
        Phase::Probe => "probe",
    }}
    fn span(&self) -> Span { match self {
        Phase::Bind => info_span!("bind"),
        Phase::Trigger => info_span!("trigger"),
        Phase::Probe => info_span!("probe"),
    }}
}

impl OpMarker for Serve {
    const NAME: &'static str = "serve";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("serve") }
}
