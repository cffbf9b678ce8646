use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "nichetrack.v1";

/// The single payload an envelope carries: a dry-run plan or an applied result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Plan(Value),
    Result(Value),
}

/// One JSON document on stdout per command in `--json` mode.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub version: &'static str,
    pub time: DateTime<Utc>,
    pub request_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    fn new(op: &'static str, payload: Payload) -> Self {
        Envelope {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION"),
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply: matches!(payload, Payload::Result(_)),
            payload,
        }
    }

    pub fn plan<T: Serialize>(op: &'static str, plan: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Payload::Plan(serde_json::to_value(plan)?)))
    }

    pub fn result<T: Serialize>(op: &'static str, result: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Payload::Result(serde_json::to_value(result)?)))
    }
}
