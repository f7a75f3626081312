use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info, warn};

use crate::models::order::{KeyType, OrderStatus, PendingOrder};
use crate::models::variant::GameVariant;

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

pub struct NewOrder<'a> {
    pub order_id: &'a str,
    pub chat_id: i64,
    pub variant: GameVariant,
    pub duration_days: i32,
    pub amount: i64,
    pub deposit_code: &'a str,
    pub key_type: KeyType,
    pub manual_username: Option<&'a str>,
    pub manual_password: Option<&'a str>,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &PgRow) -> Option<PendingOrder> {
        let variant = GameVariant::parse(&row.try_get::<String, _>("variant").unwrap_or_default())?;
        let key_type = KeyType::parse(&row.try_get::<String, _>("key_type").unwrap_or_default())?;
        let status = row
            .try_get::<String, _>("status")
            .unwrap_or_default()
            .parse::<OrderStatus>()
            .ok()?;
        Some(PendingOrder {
            id: row.try_get::<i64, _>("id").unwrap_or_default(),
            order_id: row.try_get::<String, _>("order_id").unwrap_or_default(),
            chat_id: row.try_get::<i64, _>("chat_id").unwrap_or_default(),
            variant,
            duration_days: row.try_get::<i32, _>("duration_days").unwrap_or_default(),
            amount: row.try_get::<i64, _>("amount").unwrap_or_default(),
            deposit_code: row.try_get::<String, _>("deposit_code").unwrap_or_default(),
            key_type,
            manual_username: row
                .try_get::<Option<String>, _>("manual_username")
                .ok()
                .flatten(),
            manual_password: row
                .try_get::<Option<String>, _>("manual_password")
                .ok()
                .flatten(),
            status,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .unwrap_or_else(|_| Utc::now()),
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    pub async fn insert(&self, order: NewOrder<'_>) -> Result<PendingOrder> {
        let row = sqlx::query(
            r#"
            INSERT INTO pending_orders
                (order_id, chat_id, variant, duration_days, amount, deposit_code,
                 key_type, manual_username, manual_password, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING *
            "#,
        )
        .bind(order.order_id)
        .bind(order.chat_id)
        .bind(order.variant.as_str())
        .bind(order.duration_days)
        .bind(order.amount)
        .bind(order.deposit_code)
        .bind(order.key_type.as_str())
        .bind(order.manual_username)
        .bind(order.manual_password)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert pending order")?;

        info!(
            order_id = order.order_id,
            chat_id = order.chat_id,
            amount = order.amount,
            "Created pending order"
        );
        Self::row_to_order(&row).context("Inserted order row failed to decode")
    }

    /// Most recent pending order for a chat, if any.
    pub async fn latest_pending(&self, chat_id: i64) -> Result<Option<PendingOrder>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM pending_orders
            WHERE chat_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest pending order")?;
        Ok(row.and_then(|r| Self::row_to_order(&r)))
    }

    pub async fn mark_status(&self, id: i64, status: OrderStatus) -> Result<()> {
        sqlx::query(
            "UPDATE pending_orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update order status")?;
        Ok(())
    }

    /// Flip a pending order to completed; returns false when another path
    /// already took it out of pending. Callers must only deliver the goods
    /// when the claim succeeds.
    pub async fn claim_completed(&self, id: i64) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE pending_orders
            SET status = 'completed', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to claim order for settlement")?;

        let claimed = res.rows_affected() == 1;
        if !claimed {
            warn!(order_db_id = id, "Order was already settled or cancelled");
        }
        Ok(claimed)
    }

    /// Drop pending orders older than the payment window. Returns how many
    /// rows were removed.
    pub async fn sweep_expired(&self, timeout_secs: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::seconds(timeout_secs);
        let res = sqlx::query("DELETE FROM pending_orders WHERE status = 'pending' AND created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to sweep expired orders")?;

        let removed = res.rows_affected();
        if removed > 0 {
            info!(removed, "Swept expired pending orders");
        }
        Ok(removed)
    }
}
