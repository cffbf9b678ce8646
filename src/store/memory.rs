use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::PersistError;

use super::Store;
use super::pg::{ITEMS, SUBSCRIPTIONS};
use super::types::{NewItem, NewTrend, Subscription};

#[derive(Clone, Debug, PartialEq)]
pub struct StoredItem {
    pub id: i64,
    pub item: NewItem,
    pub summary: Option<String>,
}

#[derive(Default)]
struct Tables {
    subscriptions: Vec<Subscription>,
    items: Vec<StoredItem>,
    trends: Vec<(i64, NewTrend)>,
}

/// In-memory `Store` with failure switches for pipeline tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_subscriptions: bool,
    fail_inserts_for: HashSet<String>,
    fail_insert_posts: HashSet<String>,
    subscription_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn with_subscriptions<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::default();
        for (user, sub) in pairs {
            store.subscribe(user, sub, true);
        }
        store
    }

    pub fn subscribe(&self, user_id: &str, subreddit: &str, is_active: bool) {
        let mut t = self.tables.lock().unwrap();
        let id = t.subscriptions.len() as i64 + 1;
        t.subscriptions.push(Subscription {
            id,
            user_id: user_id.to_string(),
            subreddit: subreddit.to_string(),
            is_active,
            created_at: Utc::now(),
        });
    }

    pub fn failing_subscriptions(mut self) -> Self {
        self.fail_subscriptions = true;
        self
    }

    pub fn failing_inserts_for(mut self, subreddit: &str) -> Self {
        self.fail_inserts_for.insert(subreddit.to_string());
        self
    }

    pub fn failing_insert_of(mut self, reddit_id: &str) -> Self {
        self.fail_insert_posts.insert(reddit_id.to_string());
        self
    }

    pub fn items(&self) -> Vec<StoredItem> {
        self.tables.lock().unwrap().items.clone()
    }

    pub fn trends(&self) -> Vec<NewTrend> {
        self.tables.lock().unwrap().trends.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn subscription_reads(&self) -> usize {
        self.subscription_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn active_subscriptions(&self) -> Result<Vec<Subscription>, PersistError> {
        self.subscription_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscriptions {
            return Err(PersistError::Query { table: SUBSCRIPTIONS, message: "connection refused".into() });
        }
        let t = self.tables.lock().unwrap();
        Ok(t.subscriptions.iter().filter(|s| s.is_active).cloned().collect())
    }

    async fn insert_item(&self, item: &NewItem) -> Result<i64, PersistError> {
        if self.fail_inserts_for.contains(&item.subreddit) || self.fail_insert_posts.contains(&item.reddit_id) {
            return Err(PersistError::Insert { table: ITEMS, message: "simulated insert failure".into() });
        }
        let mut t = self.tables.lock().unwrap();
        let id = t.items.len() as i64 + 1;
        t.items.push(StoredItem { id, item: item.clone(), summary: None });
        Ok(id)
    }

    async fn set_summary(&self, id: i64, summary: &str) -> Result<(), PersistError> {
        let mut t = self.tables.lock().unwrap();
        let row = t
            .items
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PersistError::Update { table: ITEMS, id, message: "row not found".into() })?;
        row.summary = Some(summary.to_string());
        Ok(())
    }

    async fn insert_trend(&self, trend: &NewTrend) -> Result<i64, PersistError> {
        let mut t = self.tables.lock().unwrap();
        let id = t.trends.len() as i64 + 1;
        t.trends.push((id, trend.clone()));
        Ok(id)
    }
}
