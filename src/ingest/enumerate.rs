use std::collections::HashSet;

use serde::Serialize;

use crate::reddit::types::normalize_subreddit;
use crate::store::Store;
use crate::telemetry;

/// One (user, subreddit) pair to run the pipeline for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Source {
    pub user_id: String,
    pub subreddit: String,
}

/// Every active subscription, once per (user, subreddit), in store order.
/// A store error yields an empty list; the run then reports zero sources.
pub async fn active_sources(store: &dyn Store) -> Vec<Source> {
    let log = telemetry::ingest();
    let subs = match store.active_subscriptions().await {
        Ok(subs) => subs,
        Err(e) => {
            log.warn_kv("⚠️ could not read subscriptions", [("error", e.to_string())]);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(subs.len());
    for s in subs {
        let subreddit = normalize_subreddit(&s.subreddit);
        if subreddit.is_empty() {
            log.warn_kv("↩️ skip", [("subscription", s.id.to_string()), ("reason", "empty-subreddit".to_string())]);
            continue;
        }
        // reddit names are case-insensitive
        if seen.insert((s.user_id.clone(), subreddit.to_ascii_lowercase())) {
            out.push(Source { user_id: s.user_id, subreddit });
        }
    }
    log.debug(format!("enumerated {} sources", out.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn only_active_subscriptions_are_enumerated() {
        let store = MemoryStore::with_subscriptions([("u1", "startups"), ("u2", "rust")]);
        store.subscribe("u1", "Entrepreneur", false);
        let sources = active_sources(&store).await;
        assert_eq!(
            sources,
            vec![
                Source { user_id: "u1".into(), subreddit: "startups".into() },
                Source { user_id: "u2".into(), subreddit: "rust".into() },
            ]
        );
    }

    #[tokio::test]
    async fn duplicates_and_prefixes_collapse() {
        let store = MemoryStore::with_subscriptions([("u1", "r/startups"), ("u1", " Startups "), ("u2", "startups")]);
        let sources = active_sources(&store).await;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].subreddit, "startups");
        assert_eq!(sources[1].user_id, "u2");
    }

    #[tokio::test]
    async fn store_failure_yields_no_sources() {
        let store = MemoryStore::with_subscriptions([("u1", "startups")]).failing_subscriptions();
        assert!(active_sources(&store).await.is_empty());
        assert_eq!(store.subscription_reads(), 1);
    }
}
