use serde::Serialize;
use tracing::Instrument;

use crate::enrich::Enricher;
use crate::error::ItemError;
use crate::reddit::types::Post;
use crate::store::{NewItem, NewTrend};
use crate::telemetry;
use crate::telemetry::ops::ingest::Phase as IngestPhase;

use super::enumerate::Source;
use super::{PipelineDeps, PipelineOptions};

/// A post that hit an error while its siblings carried on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostFailure {
    pub reddit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    pub kind: String,
    pub reason: String,
}

impl PostFailure {
    fn new(post: &Post, item_id: Option<i64>, err: &ItemError) -> Self {
        Self { reddit_id: post.id.clone(), item_id, kind: err.kind().to_string(), reason: err.to_string() }
    }
}

/// What one pipeline wrote, plus the posts that failed along the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Processed {
    pub item_ids: Vec<i64>,
    pub summarized: usize,
    pub errors: Vec<PostFailure>,
}

/// Fetch, persist and enrich the top posts of one source.
///
/// Posts are handled independently: an insert or enrichment error is recorded
/// against its post and the loop moves on. The source fails only when the
/// listing cannot be fetched or no post could be persisted.
pub async fn process_source(deps: &PipelineDeps, source: &Source, opts: &PipelineOptions) -> Result<Processed, ItemError> {
    let log = telemetry::ingest();
    let sub = source.subreddit.as_str();

    let posts = deps
        .source
        .top_posts(sub, opts.post_limit, opts.window)
        .instrument(log.span_kv(&IngestPhase::FetchPosts, [("limit", opts.post_limit.to_string()), ("window", opts.window.to_string())]))
        .await?;

    let summarizer = deps.enricher.as_deref().filter(|_| opts.summarize);
    let mut out = Processed::default();
    let mut first_error = None;
    for post in &posts {
        let inserted = out.item_ids.len();
        if let Err(e) = process_post(deps, source, post, summarizer, opts, &mut out).await {
            let item_id = out.item_ids.get(inserted).copied();
            log.warn_kv("⚠️ post failed", [("reddit_id", post.id.clone()), ("kind", e.kind().to_string()), ("reason", e.to_string())]);
            out.errors.push(PostFailure::new(post, item_id, &e));
            first_error.get_or_insert(e);
        }
    }

    if out.item_ids.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    if opts.classify {
        if let (Some(enricher), Some(first)) = (deps.enricher.as_deref(), posts.first()) {
            if let Err(e) = classify_first(deps, source, enricher, first, out.item_ids.first().copied()).await {
                log.warn_kv("⚠️ classify failed", [("reddit_id", first.id.clone()), ("reason", e.to_string())]);
                out.errors.push(PostFailure::new(first, out.item_ids.first().copied(), &e));
            }
        }
    }

    Ok(out)
}

async fn process_post(
    deps: &PipelineDeps,
    source: &Source,
    post: &Post,
    summarizer: Option<&Enricher>,
    opts: &PipelineOptions,
    out: &mut Processed,
) -> Result<(), ItemError> {
    let log = telemetry::ingest();
    let sub = source.subreddit.as_str();
    let item = NewItem::from_post(&source.user_id, sub, post);
    let id = deps
        .store
        .insert_item(&item)
        .instrument(log.span_kv(&IngestPhase::WriteItem, [("reddit_id", post.id.clone())]))
        .await?;
    out.item_ids.push(id);
    log.info_kv("➕ insert", [("id", id.to_string()), ("subreddit", sub.to_string()), ("title", post.title.clone())]);

    let Some(enricher) = summarizer else { return Ok(()) };
    let comments = deps
        .source
        .top_comments(sub, &post.id, opts.comment_limit)
        .instrument(log.span(&IngestPhase::FetchComments))
        .await?;
    let summary = enricher
        .summarize(&post.title, &comments)
        .instrument(log.span_kv(&IngestPhase::Summarize, [("comments", comments.len().to_string())]))
        .await?;
    match summary {
        Some(text) => {
            deps.store.set_summary(id, &text).await?;
            out.summarized += 1;
        }
        None => log.debug(format!("no qualifying comments for {}, summary left empty", post.id)),
    }
    Ok(())
}

async fn classify_first(
    deps: &PipelineDeps,
    source: &Source,
    enricher: &Enricher,
    first: &Post,
    source_item_id: Option<i64>,
) -> Result<(), ItemError> {
    let log = telemetry::ingest();
    let insight = enricher
        .classify(&first.title)
        .instrument(log.span_kv(&IngestPhase::Classify, [("reddit_id", first.id.clone())]))
        .await?;
    let trend = NewTrend { user_id: source.user_id.clone(), subreddit: source.subreddit.clone(), source_item_id, insight };
    let trend_id = deps.store.insert_trend(&trend).await?;
    log.info_kv("📈 trend", [("id", trend_id.to_string()), ("category", trend.insight.category.to_string())]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::{FetchError, PersistError};
    use crate::llm::openai::{MockClient, RawCompletion};
    use crate::store::memory::MemoryStore;
    use crate::testing::{Script, StubSource, deps, post};

    fn source(sub: &str) -> Source {
        Source { user_id: "u1".into(), subreddit: sub.into() }
    }

    fn opts() -> PipelineOptions {
        PipelineOptions { summarize: true, ..PipelineOptions::default() }
    }

    #[tokio::test]
    async fn inserts_then_attaches_summary() {
        let stub = Arc::new(
            StubSource::new()
                .script("startups", Script::Posts(vec![post("startups", "a1", "Bootstrapped to 10k MRR")]))
                .comments("a1", &["Great story", "How long did it take?"]),
        );
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        llm.push_content("  Founders share a bootstrapping story.  ");

        let out = process_source(&deps(stub.clone(), store.clone(), Some(llm.clone())), &source("startups"), &opts())
            .await
            .unwrap();

        assert_eq!(out, Processed { item_ids: vec![1], summarized: 1, errors: Vec::new() });
        let items = store.items();
        assert_eq!(items[0].item.reddit_id, "a1");
        assert_eq!(items[0].summary.as_deref(), Some("Founders share a bootstrapping story."));
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn post_without_comments_keeps_null_summary() {
        let stub = Arc::new(StubSource::new().script("startups", Script::Posts(vec![post("startups", "a1", "Quiet post")])));
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());

        let out = process_source(&deps(stub, store.clone(), Some(llm.clone())), &source("startups"), &opts())
            .await
            .unwrap();

        assert_eq!(out.summarized, 0);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].summary, None);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn html_error_from_llm_is_recorded_against_the_post() {
        let stub = Arc::new(
            StubSource::new()
                .script("startups", Script::Posts(vec![post("startups", "a1", "Title")]))
                .comments("a1", &["a comment"]),
        );
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        llm.push_response(Ok(RawCompletion {
            status: 502,
            content_type: Some("text/html".into()),
            body: "<html><body>Bad gateway</body></html>".into(),
        }));

        let out = process_source(&deps(stub, store.clone(), Some(llm)), &source("startups"), &opts())
            .await
            .unwrap();

        assert_eq!(out.item_ids, vec![1]);
        assert_eq!(out.summarized, 0);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].reddit_id, "a1");
        assert_eq!(out.errors[0].item_id, Some(1));
        assert_eq!(out.errors[0].kind, "enrichment");
        assert!(out.errors[0].reason.contains("502"));
        assert_eq!(store.items()[0].summary, None);
    }

    #[tokio::test]
    async fn llm_rate_limit_on_first_post_does_not_drop_the_rest() {
        let stub = Arc::new(
            StubSource::new()
                .script(
                    "startups",
                    Script::Posts(vec![post("startups", "a1", "One"), post("startups", "a2", "Two"), post("startups", "a3", "Three")]),
                )
                .comments("a1", &["c1"])
                .comments("a2", &["c2"])
                .comments("a3", &["c3"]),
        );
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        llm.push_response(Ok(RawCompletion {
            status: 429,
            content_type: Some("text/html".into()),
            body: "<html><body>Too Many Requests</body></html>".into(),
        }));
        llm.push_content("s2");
        llm.push_content("s3");

        let out = process_source(&deps(stub, store.clone(), Some(llm)), &source("startups"), &opts())
            .await
            .unwrap();

        let items = store.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].summary, None);
        assert_eq!(items[1].summary.as_deref(), Some("s2"));
        assert_eq!(items[2].summary.as_deref(), Some("s3"));
        assert_eq!(out.item_ids, vec![1, 2, 3]);
        assert_eq!(out.summarized, 2);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].reddit_id, "a1");
    }

    #[tokio::test]
    async fn fetch_error_is_reported_as_fetch() {
        let stub = Arc::new(StubSource::new().script("Entrepreneur", Script::Status(429)));
        let store = Arc::new(MemoryStore::default());
        let err = process_source(&deps(stub, store.clone(), None), &source("Entrepreneur"), &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::Fetch(FetchError::Status { status: 429, .. })));
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn insert_failure_of_every_post_fails_the_source() {
        let stub = Arc::new(StubSource::new().script(
            "startups",
            Script::Posts(vec![post("startups", "a1", "Title"), post("startups", "a2", "Other")]),
        ));
        let store = Arc::new(MemoryStore::default().failing_inserts_for("startups"));
        let err = process_source(&deps(stub.clone(), store, None), &source("startups"), &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::Persist(PersistError::Insert { .. })));
        assert_eq!(err.kind(), "persist");
        assert_eq!(stub.comment_calls(), 0);
    }

    #[tokio::test]
    async fn one_failed_insert_keeps_the_other_posts() {
        let stub = Arc::new(
            StubSource::new()
                .script("startups", Script::Posts(vec![post("startups", "a1", "One"), post("startups", "a2", "Two")]))
                .comments("a2", &["useful"]),
        );
        let store = Arc::new(MemoryStore::default().failing_insert_of("a1"));
        let llm = Arc::new(MockClient::new());
        llm.push_content("summary two");

        let out = process_source(&deps(stub.clone(), store.clone(), Some(llm)), &source("startups"), &opts())
            .await
            .unwrap();

        assert_eq!(out.item_ids, vec![1]);
        assert_eq!(out.summarized, 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!((out.errors[0].reddit_id.as_str(), out.errors[0].item_id), ("a1", None));
        assert_eq!(out.errors[0].kind, "persist");
        // comments are only fetched for the post that was stored
        assert_eq!(stub.comment_calls(), 1);
        assert_eq!(store.items()[0].item.reddit_id, "a2");
    }

    #[tokio::test]
    async fn summarize_off_skips_comment_fetch() {
        let stub = Arc::new(StubSource::new().script(
            "startups",
            Script::Posts(vec![post("startups", "a1", "One"), post("startups", "a2", "Two")]),
        ));
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        let opts = PipelineOptions { summarize: false, ..PipelineOptions::default() };

        let out = process_source(&deps(stub.clone(), store, Some(llm.clone())), &source("startups"), &opts)
            .await
            .unwrap();
        assert_eq!(out.item_ids, vec![1, 2]);
        assert_eq!(stub.comment_calls(), 0);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn classify_links_trend_to_first_item() {
        let stub = Arc::new(StubSource::new().script(
            "solotravel",
            Script::Posts(vec![post("solotravel", "t1", "Slow travel in Portugal"), post("solotravel", "t2", "Packing light")]),
        ));
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        llm.push_content(
            r#"{"title":"Slow travel","description":"Longer stays in fewer places.","category":"travel","ideas":["Month in Porto","Budget breakdown"]}"#,
        );
        let opts = PipelineOptions { summarize: false, classify: true, ..PipelineOptions::default() };

        process_source(&deps(stub, store.clone(), Some(llm)), &source("solotravel"), &opts).await.unwrap();

        let trends = store.trends();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].source_item_id, Some(1));
        assert_eq!(trends[0].insight.ideas.len(), 2);
    }

    #[tokio::test]
    async fn malformed_trend_keeps_the_items() {
        let stub = Arc::new(StubSource::new().script("solotravel", Script::Posts(vec![post("solotravel", "t1", "Hostel tips")])));
        let store = Arc::new(MemoryStore::default());
        let llm = Arc::new(MockClient::new());
        llm.push_content("not json at all");
        let opts = PipelineOptions { summarize: false, classify: true, ..PipelineOptions::default() };

        let out = process_source(&deps(stub, store.clone(), Some(llm)), &source("solotravel"), &opts).await.unwrap();

        assert_eq!(out.item_ids, vec![1]);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].kind, "enrichment");
        assert!(store.trends().is_empty());
    }
}
