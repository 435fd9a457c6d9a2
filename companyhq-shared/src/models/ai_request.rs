/// AI request log
///
/// One row per successful AI gateway call. The log is append-only and is
/// what the daily quota counts.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE ai_requests (
///     id BLOB PRIMARY KEY NOT NULL,
///     user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     prompt TEXT NOT NULL,
///     response TEXT,
///     task_type TEXT NOT NULL DEFAULT 'general',
///     tokens_used INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub response: Option<String>,
    pub task_type: String,
    pub tokens_used: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for logging a request
#[derive(Debug, Clone)]
pub struct CreateAiRequest {
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub task_type: String,
    pub tokens_used: i64,
}

impl AiRequest {
    /// Appends a request to the log at `created_at`
    pub async fn create(
        pool: &SqlitePool,
        data: CreateAiRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, AiRequest>(
            r#"
            INSERT INTO ai_requests (id, user_id, prompt, response, task_type, tokens_used, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, user_id, prompt, response, task_type, tokens_used, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.prompt)
        .bind(data.response)
        .bind(data.task_type)
        .bind(data.tokens_used)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(request)
    }

    /// Counts the user's requests logged at or after `since`
    pub async fn count_since(
        pool: &SqlitePool,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM ai_requests WHERE user_id = ?1 AND created_at >= ?2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Lists the user's most recent requests
    pub async fn list_recent(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, AiRequest>(
            r#"
            SELECT id, user_id, prompt, response, task_type, tokens_used, created_at
            FROM ai_requests
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }
}
