use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::PersistError;

use super::Store;
use super::types::{NewItem, NewTrend, Subscription};

pub const SUBSCRIPTIONS: &str = "user_subreddits";
pub const ITEMS: &str = "user_posts";
pub const TRENDS: &str = "user_trends";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn active_subscriptions(&self) -> Result<Vec<Subscription>, PersistError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, subreddit, is_active, created_at
            FROM user_subreddits
            WHERE is_active
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistError::Query { table: SUBSCRIPTIONS, message: e.to_string() })
    }

    async fn insert_item(&self, item: &NewItem) -> Result<i64, PersistError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_posts (user_id, subreddit, reddit_id, title, url, score, num_comments, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&item.user_id)
        .bind(&item.subreddit)
        .bind(&item.reddit_id)
        .bind(&item.title)
        .bind(&item.url)
        .bind(item.score)
        .bind(item.num_comments)
        .bind(item.created_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PersistError::Insert { table: ITEMS, message: e.to_string() })
    }

    async fn set_summary(&self, id: i64, summary: &str) -> Result<(), PersistError> {
        let res = sqlx::query("UPDATE user_posts SET summary = $2 WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(&self.pool)
            .await
            .map_err(|e| PersistError::Update { table: ITEMS, id, message: e.to_string() })?;
        if res.rows_affected() == 0 {
            return Err(PersistError::Update { table: ITEMS, id, message: "row not found".into() });
        }
        Ok(())
    }

    async fn insert_trend(&self, trend: &NewTrend) -> Result<i64, PersistError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_trends (user_id, subreddit, source_item_id, title, description, category, ideas)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&trend.user_id)
        .bind(&trend.subreddit)
        .bind(trend.source_item_id)
        .bind(&trend.insight.title)
        .bind(&trend.insight.description)
        .bind(trend.insight.category.as_str())
        .bind(&trend.insight.ideas)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PersistError::Insert { table: TRENDS, message: e.to_string() })
    }
}
