use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::StoredPost;
use crate::extract::PostRecord;

/// Insert posts collected for `query`, ignoring ids that are already stored.
///
/// Returns the number of rows actually inserted.
pub async fn insert_posts(pool: &SqlitePool, query: &str, records: &[PostRecord]) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut inserted = 0;

    for record in records {
        let hashtags = serde_json::to_string(&record.hashtags)?;
        let mentions = serde_json::to_string(&record.mentions)?;
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO posts
                (id, query, author_handle, posted_at, text, hashtags, mentions, permalink, collected_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.id)
        .bind(query)
        .bind(&record.author_handle)
        .bind(record.posted_at.map(|dt| dt.to_rfc3339()))
        .bind(&record.text)
        .bind(hashtags)
        .bind(mentions)
        .bind(&record.permalink)
        .bind(record.collected_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert post {}", record.id))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await.context("Failed to commit posts")?;
    Ok(inserted)
}

/// Get a post by id.
pub async fn get_post(pool: &SqlitePool, id: &str) -> Result<Option<StoredPost>> {
    sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")
}

/// Count all stored posts.
pub async fn count_posts(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(count)
}

/// Most recently collected posts first.
pub async fn recent_posts(pool: &SqlitePool, limit: i64) -> Result<Vec<StoredPost>> {
    sqlx::query_as("SELECT * FROM posts ORDER BY collected_at DESC, rowid DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to fetch recent posts")
}

/// Posts first stored for `query`, in insertion order.
pub async fn posts_for_query(pool: &SqlitePool, query: &str) -> Result<Vec<StoredPost>> {
    sqlx::query_as("SELECT * FROM posts WHERE query = ? ORDER BY rowid")
        .bind(query)
        .fetch_all(pool)
        .await
        .context("Failed to fetch posts for query")
}
