use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrich::TrendInsight;
use crate::reddit::types::Post;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub subreddit: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row to insert into `user_posts`; the summary is attached afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct NewItem {
    pub user_id: String,
    pub subreddit: String,
    pub reddit_id: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: DateTime<Utc>,
}

impl NewItem {
    pub fn from_post(user_id: &str, subreddit: &str, post: &Post) -> Self {
        Self {
            user_id: user_id.to_string(),
            subreddit: subreddit.to_string(),
            reddit_id: post.id.clone(),
            title: post.title.clone(),
            url: post.url.clone(),
            score: post.score,
            num_comments: post.num_comments,
            created_utc: post.created_utc,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewTrend {
    pub user_id: String,
    pub subreddit: String,
    pub source_item_id: Option<i64>,
    pub insight: TrendInsight,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub user_id: String,
    pub subreddit: String,
    pub reddit_id: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: DateTime<Utc>,
    pub summary: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct TrendRow {
    pub id: i64,
    pub user_id: String,
    pub subreddit: String,
    pub source_item_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub ideas: Vec<String>,
    pub created_at: DateTime<Utc>,
}
