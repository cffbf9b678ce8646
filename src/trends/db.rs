use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::store::types::TrendRow;

pub async fn list_trends(
    pool: &PgPool,
    user_id: Option<&str>,
    category: Option<&str>,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<TrendRow>> {
    let rows = sqlx::query_as::<_, TrendRow>(
        r#"
        SELECT id, user_id, subreddit, source_item_id, title, description, category, ideas, created_at
        FROM user_trends
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::timestamptz IS NULL OR created_at >= $3)
        ORDER BY created_at DESC, id DESC
        LIMIT $4
        "#,
    )
    .bind(user_id)
    .bind(category)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
