use serde::Serialize;

use crate::error::ItemError;

use super::enumerate::Source;
use super::pipeline::{PostFailure, Processed};

/// Outcome of one source's pipeline. Never persisted.
///
/// A source that stored at least one item is `Processed`, with any per-post
/// failures listed under `errors`. `Failed` means nothing was written.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceOutcome {
    Processed {
        user_id: String,
        subreddit: String,
        item_ids: Vec<i64>,
        summarized: usize,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        errors: Vec<PostFailure>,
    },
    Failed { user_id: String, subreddit: String, kind: String, reason: String },
}

impl SourceOutcome {
    pub fn from_result(source: &Source, result: Result<Processed, ItemError>) -> Self {
        match result {
            Ok(p) => SourceOutcome::Processed {
                user_id: source.user_id.clone(),
                subreddit: source.subreddit.clone(),
                item_ids: p.item_ids,
                summarized: p.summarized,
                errors: p.errors,
            },
            Err(e) => SourceOutcome::Failed {
                user_id: source.user_id.clone(),
                subreddit: source.subreddit.clone(),
                kind: e.kind().to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            SourceOutcome::Processed { subreddit, .. } | SourceOutcome::Failed { subreddit, .. } => subreddit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub sources: usize,
    pub processed: usize,
    pub failed: usize,
    pub items: usize,
    pub post_errors: usize,
}

/// Aggregated result of one ingestion run, in source order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub success: bool,
    pub processed: Vec<String>,
    pub failed: Vec<String>,
    pub details: Vec<SourceOutcome>,
    pub totals: RunTotals,
}

impl RunReport {
    pub fn from_outcomes(details: Vec<SourceOutcome>) -> Self {
        let mut processed = Vec::new();
        let mut failed = Vec::new();
        let (mut items, mut post_errors) = (0usize, 0usize);
        for outcome in &details {
            match outcome {
                SourceOutcome::Processed { subreddit, item_ids, errors, .. } => {
                    items += item_ids.len();
                    post_errors += errors.len();
                    processed.push(subreddit.clone());
                }
                SourceOutcome::Failed { subreddit, .. } => failed.push(subreddit.clone()),
            }
        }
        let totals = RunTotals { sources: details.len(), processed: processed.len(), failed: failed.len(), items, post_errors };
        // per-source failures are reported, not raised
        RunReport { success: true, processed, failed, details, totals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use serde_json::json;

    fn src(user: &str, sub: &str) -> Source {
        Source { user_id: user.into(), subreddit: sub.into() }
    }

    #[test]
    fn report_lists_each_source_once() {
        let outcomes = vec![
            SourceOutcome::from_result(&src("u1", "startups"), Ok(Processed { item_ids: vec![1, 2], summarized: 1, errors: Vec::new() })),
            SourceOutcome::from_result(
                &src("u1", "Entrepreneur"),
                Err(ItemError::Fetch(FetchError::Status { subreddit: "Entrepreneur".into(), status: 429 })),
            ),
        ];
        let report = RunReport::from_outcomes(outcomes);
        assert!(report.success);
        assert_eq!(report.processed, vec!["startups"]);
        assert_eq!(report.failed, vec!["Entrepreneur"]);
        assert_eq!(report.totals, RunTotals { sources: 2, processed: 1, failed: 1, items: 2, post_errors: 0 });
    }

    #[test]
    fn details_are_tagged_by_status() {
        let report = RunReport::from_outcomes(vec![
            SourceOutcome::from_result(&src("u1", "startups"), Ok(Processed { item_ids: vec![7], summarized: 0, errors: Vec::new() })),
            SourceOutcome::from_result(&src("u2", "rust"), Err(ItemError::Panicked("boom".into()))),
        ]);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(
            v["details"][0],
            json!({"status": "processed", "user_id": "u1", "subreddit": "startups", "item_ids": [7], "summarized": 0})
        );
        assert_eq!(v["details"][1]["status"], "failed");
        assert_eq!(v["details"][1]["kind"], "panic");
        assert_eq!(v["details"][1]["reason"], "pipeline panicked: boom");
    }

    #[test]
    fn partially_failed_source_counts_its_rows() {
        let partial = Processed {
            item_ids: vec![3, 4, 5],
            summarized: 2,
            errors: vec![PostFailure {
                reddit_id: "p1".into(),
                item_id: Some(3),
                kind: "enrichment".into(),
                reason: "api error 429: Too Many Requests".into(),
            }],
        };
        let report = RunReport::from_outcomes(vec![SourceOutcome::from_result(&src("u1", "startups"), Ok(partial))]);

        assert_eq!(report.processed, vec!["startups"]);
        // the row of the failed post still counts
        assert_eq!(report.totals.items, 3);
        assert_eq!(report.totals.post_errors, 1);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(
            v["details"][0]["errors"],
            json!([{"reddit_id": "p1", "item_id": 3, "kind": "enrichment", "reason": "api error 429: Too Many Requests"}])
        );
    }

    #[test]
    fn empty_run_is_still_a_success() {
        let report = RunReport::from_outcomes(Vec::new());
        assert!(report.success);
        assert_eq!(report.totals, RunTotals::default());
    }
}
