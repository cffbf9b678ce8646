//! Scripted fakes shared by pipeline, orchestrator and server tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::enrich::Enricher;
use crate::error::FetchError;
use crate::ingest::PipelineDeps;
use crate::llm::openai::MockClient;
use crate::reddit::ContentSource;
use crate::reddit::types::{Post, TimeWindow};
use crate::store::memory::MemoryStore;

pub fn deps(source: Arc<StubSource>, store: Arc<MemoryStore>, llm: Option<Arc<MockClient>>) -> PipelineDeps {
    PipelineDeps {
        source,
        store,
        enricher: llm.map(|llm| Arc::new(Enricher::new(llm))),
    }
}

pub fn post(subreddit: &str, id: &str, title: &str) -> Post {
    Post {
        id: id.to_string(),
        subreddit: subreddit.to_string(),
        title: title.to_string(),
        url: format!("https://www.reddit.com/r/{subreddit}/comments/{id}/"),
        score: 42,
        num_comments: 3,
        created_utc: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
    }
}

#[derive(Clone, Debug)]
pub enum Script {
    Posts(Vec<Post>),
    Status(u16),
    Empty,
    Panic,
}

/// `ContentSource` answering from per-subreddit scripts; anything unscripted is a 404.
#[derive(Default)]
pub struct StubSource {
    posts: Mutex<HashMap<String, Script>>,
    comments: Mutex<HashMap<String, Vec<String>>>,
    post_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, subreddit: &str, script: Script) -> Self {
        self.posts.lock().unwrap().insert(subreddit.to_string(), script);
        self
    }

    pub fn comments(self, post_id: &str, bodies: &[&str]) -> Self {
        self.comments
            .lock()
            .unwrap()
            .insert(post_id.to_string(), bodies.iter().map(|b| b.to_string()).collect());
        self
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.post_calls() + self.comment_calls()
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn top_posts(&self, subreddit: &str, limit: u32, _window: TimeWindow) -> Result<Vec<Post>, FetchError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.posts.lock().unwrap().get(subreddit).cloned();
        match script {
            Some(Script::Posts(posts)) => Ok(posts.into_iter().take(limit as usize).collect()),
            Some(Script::Status(status)) => Err(FetchError::Status { subreddit: subreddit.to_string(), status }),
            Some(Script::Empty) => Err(FetchError::Empty(subreddit.to_string())),
            Some(Script::Panic) => panic!("scripted panic for r/{subreddit}"),
            None => Err(FetchError::Status { subreddit: subreddit.to_string(), status: 404 }),
        }
    }

    async fn top_comments(&self, _subreddit: &str, post_id: &str, limit: u32) -> Result<Vec<String>, FetchError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let bodies = self.comments.lock().unwrap().get(post_id).cloned().unwrap_or_default();
        Ok(bodies.into_iter().take(limit as usize).collect())
    }
}
