use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::models::session::{Session, SessionState};

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: &PgRow) -> Option<Session> {
        let state_raw: String = row.try_get("state").unwrap_or_default();
        let state = SessionState::parse(&state_raw)?;
        Some(Session {
            chat_id: row.try_get::<i64, _>("chat_id").unwrap_or_default(),
            state,
            data: row
                .try_get::<String, _>("data")
                .unwrap_or_else(|_| "{}".to_string()),
            error_count: row.try_get::<i32, _>("error_count").unwrap_or_default(),
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .unwrap_or_else(|_| Utc::now()),
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    pub async fn get(&self, chat_id: i64) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch session")?;
        Ok(row.and_then(|r| Self::row_to_session(&r)))
    }

    /// Put the chat into a waiting state, serializing the state payload.
    /// Replaces any existing session and resets the strike counter.
    pub async fn set<T: Serialize>(
        &self,
        chat_id: i64,
        state: SessionState,
        payload: &T,
    ) -> Result<()> {
        let data = serde_json::to_string(payload).context("Failed to serialize session data")?;
        sqlx::query(
            r#"
            INSERT INTO sessions (chat_id, state, data, error_count)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (chat_id) DO UPDATE SET
                state = excluded.state,
                data = excluded.data,
                error_count = 0,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(chat_id)
        .bind(state.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await
        .context("Failed to set session state")?;
        Ok(())
    }

    pub async fn set_error_count(&self, chat_id: i64, count: i32) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET error_count = $1, updated_at = CURRENT_TIMESTAMP WHERE chat_id = $2",
        )
        .bind(count)
        .bind(chat_id)
        .execute(&self.pool)
        .await
        .context("Failed to update session strike count")?;
        Ok(())
    }

    pub async fn clear(&self, chat_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear session")?;
        Ok(())
    }
}
