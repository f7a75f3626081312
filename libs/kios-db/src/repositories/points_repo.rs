use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::info;

use crate::models::points::PointBalance;

#[derive(Debug, Clone)]
pub struct PointsRepository {
    pool: PgPool,
}

impl PointsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_balance(row: &PgRow) -> PointBalance {
        PointBalance {
            chat_id: row.try_get::<i64, _>("chat_id").unwrap_or_default(),
            points: row.try_get::<i64, _>("points").unwrap_or_default(),
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .unwrap_or_else(|_| Utc::now()),
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .unwrap_or_else(|_| Utc::now()),
        }
    }

    /// Balance for a chat, creating a zero row on first touch.
    pub async fn get_or_create(&self, chat_id: i64) -> Result<PointBalance> {
        let row = sqlx::query(
            r#"
            INSERT INTO point_balances (chat_id, points)
            VALUES ($1, 0)
            ON CONFLICT (chat_id) DO UPDATE SET chat_id = excluded.chat_id
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch point balance")?;
        Ok(Self::row_to_balance(&row))
    }

    /// Credit earned points and journal the movement. Returns the new balance.
    pub async fn credit(&self, chat_id: i64, amount: i64, reason: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await.context("Failed to begin credit")?;

        sqlx::query(
            r#"
            INSERT INTO point_balances (chat_id, points)
            VALUES ($1, 0)
            ON CONFLICT (chat_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await
        .context("Failed to ensure point balance row")?;

        let new_balance: i64 = sqlx::query_scalar(
            r#"
            UPDATE point_balances
            SET points = points + $1, updated_at = CURRENT_TIMESTAMP
            WHERE chat_id = $2
            RETURNING points
            "#,
        )
        .bind(amount)
        .bind(chat_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to credit points")?;

        sqlx::query(
            "INSERT INTO point_transactions (chat_id, delta, kind, reason) VALUES ($1, $2, 'earn', $3)",
        )
        .bind(chat_id)
        .bind(amount)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .context("Failed to journal point credit")?;

        tx.commit().await.context("Failed to commit credit")?;

        info!(chat_id, amount, new_balance, "Credited reward points");
        Ok(new_balance)
    }
}
