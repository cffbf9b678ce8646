use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::store::types::ItemRow;

/// A user's feed, newest post first.
pub async fn list_posts(
    pool: &PgPool,
    user_id: &str,
    subreddit: Option<&str>,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<ItemRow>> {
    let rows = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, user_id, subreddit, reddit_id, title, url, score, num_comments,
               created_utc, summary, ingested_at
        FROM user_posts
        WHERE user_id = $1
          AND ($2::text IS NULL OR lower(subreddit) = lower($2))
          AND ($3::timestamptz IS NULL OR created_utc >= $3)
        ORDER BY created_utc DESC, id DESC
        LIMIT $4
        "#,
    )
    .bind(user_id)
    .bind(subreddit)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
