use anyhow::Result;
use sqlx::PgPool;

use crate::store::Subscription;

/// Returns the row id and whether the row is new. Re-adding an existing
/// pair only updates its active flag.
pub async fn upsert_subscription(pool: &PgPool, user_id: &str, subreddit: &str, active: bool) -> Result<(i64, bool)> {
    let row = sqlx::query_as::<_, (i64, bool)>(
        r#"
        INSERT INTO user_subreddits (user_id, subreddit, is_active)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, subreddit)
        DO UPDATE SET is_active = EXCLUDED.is_active
        RETURNING id, (xmax = 0) AS inserted
        "#,
    )
    .bind(user_id)
    .bind(subreddit)
    .bind(active)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_subscriptions(pool: &PgPool, user_id: Option<&str>, active: Option<bool>) -> Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT id, user_id, subreddit, is_active, created_at
        FROM user_subreddits
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::bool IS NULL OR is_active = $2)
        ORDER BY user_id, created_at, id
        "#,
    )
    .bind(user_id)
    .bind(active)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_subscription(pool: &PgPool, id: i64) -> Result<Option<Subscription>> {
    let row = sqlx::query_as::<_, Subscription>(
        "SELECT id, user_id, subreddit, is_active, created_at FROM user_subreddits WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_subscription(pool: &PgPool, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM user_subreddits WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn set_active(pool: &PgPool, id: i64, active: bool) -> Result<bool> {
    let res = sqlx::query("UPDATE user_subreddits SET is_active = $2 WHERE id = $1 AND is_active <> $2")
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
