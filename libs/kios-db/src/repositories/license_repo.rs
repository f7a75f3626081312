use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::info;

use crate::models::license::{rollover_expiry, License, LICENSE_STATUS_ACTIVE};
use crate::models::points::RedeemTxOutcome;
use crate::models::variant::GameVariant;

#[derive(Debug, Clone)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_license(row: &PgRow) -> License {
        License {
            id: row.try_get::<i64, _>("id").unwrap_or_default(),
            username: row.try_get::<String, _>("username").unwrap_or_default(),
            password: row.try_get::<String, _>("password").unwrap_or_default(),
            device_uuid: row.try_get::<String, _>("device_uuid").unwrap_or_default(),
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .unwrap_or_else(|_| Utc::now()),
            status: row.try_get::<String, _>("status").unwrap_or_default(),
            reference: row.try_get::<String, _>("reference").unwrap_or_default(),
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .unwrap_or_else(|_| Utc::now()),
        }
    }

    pub async fn username_exists(&self, variant: GameVariant, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE username = $1",
            variant.table()
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check username availability")?;
        Ok(count > 0)
    }

    pub async fn find_by_credentials(
        &self,
        variant: GameVariant,
        username: &str,
        password: &str,
    ) -> Result<Option<License>> {
        let row = sqlx::query(&format!(
            "SELECT * FROM {} WHERE username = $1 AND password = $2",
            variant.table()
        ))
        .bind(username)
        .bind(password)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up license by credentials")?;
        Ok(row.map(|r| Self::row_to_license(&r)))
    }

    /// Insert a freshly sold license. Fails if the username is already taken,
    /// which can happen when a manual-input order settles after a concurrent
    /// purchase claimed the same name.
    pub async fn insert(
        &self,
        variant: GameVariant,
        username: &str,
        password: &str,
        duration_days: i64,
        reference: &str,
    ) -> Result<License> {
        let expires_at = Utc::now() + Duration::days(duration_days);
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {} (username, password, device_uuid, expires_at, status, reference)
            VALUES ($1, $2, '', $3, $4, $5)
            RETURNING *
            "#,
            variant.table()
        ))
        .bind(username)
        .bind(password)
        .bind(expires_at)
        .bind(LICENSE_STATUS_ACTIVE)
        .bind(reference)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert license")?;

        info!(
            variant = variant.as_str(),
            username, duration_days, "Issued new license"
        );
        Ok(Self::row_to_license(&row))
    }

    /// Push the expiry of an existing account forward. An already-expired
    /// account restarts from now instead of its stale expiry.
    pub async fn extend(
        &self,
        variant: GameVariant,
        license_id: i64,
        current_expiry: DateTime<Utc>,
        duration_days: i64,
    ) -> Result<DateTime<Utc>> {
        let new_expiry = rollover_expiry(current_expiry, Utc::now(), duration_days);
        sqlx::query(&format!(
            "UPDATE {} SET expires_at = $1 WHERE id = $2",
            variant.table()
        ))
        .bind(new_expiry)
        .bind(license_id)
        .execute(&self.pool)
        .await
        .context("Failed to extend license expiry")?;

        info!(
            variant = variant.as_str(),
            license_id, duration_days, "Extended license"
        );
        Ok(new_expiry)
    }

    /// Spend points on a free account: debit and license insert commit
    /// together or not at all. The debit is conditional on the balance so two
    /// concurrent redeems cannot both succeed off the same points.
    #[allow(clippy::too_many_arguments)]
    pub async fn redeem_into_license(
        &self,
        variant: GameVariant,
        chat_id: i64,
        points_needed: i64,
        username: &str,
        password: &str,
        duration_days: i64,
        reference: &str,
    ) -> Result<RedeemTxOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin redeem")?;

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE point_balances
            SET points = points - $1, updated_at = CURRENT_TIMESTAMP
            WHERE chat_id = $2 AND points >= $1
            RETURNING points
            "#,
        )
        .bind(points_needed)
        .bind(chat_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit points")?;

        let Some(remaining_points) = remaining else {
            tx.rollback().await.context("Failed to roll back redeem")?;
            let have: i64 =
                sqlx::query_scalar("SELECT points FROM point_balances WHERE chat_id = $1")
                    .bind(chat_id)
                    .fetch_optional(&self.pool)
                    .await
                    .context("Failed to fetch balance after refused redeem")?
                    .unwrap_or(0);
            return Ok(RedeemTxOutcome::InsufficientPoints { have });
        };

        sqlx::query(
            "INSERT INTO point_transactions (chat_id, delta, kind, reason) VALUES ($1, $2, 'redeem', $3)",
        )
        .bind(chat_id)
        .bind(-points_needed)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .context("Failed to journal point debit")?;

        let expires_at = Utc::now() + Duration::days(duration_days);
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (username, password, device_uuid, expires_at, status, reference)
            VALUES ($1, $2, '', $3, $4, $5)
            "#,
            variant.table()
        ))
        .bind(username)
        .bind(password)
        .bind(expires_at)
        .bind(LICENSE_STATUS_ACTIVE)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .context("Failed to insert redeemed license")?;

        tx.commit().await.context("Failed to commit redeem")?;

        info!(
            chat_id,
            points_needed, remaining_points, "Redeemed points for a license"
        );
        Ok(RedeemTxOutcome::Created {
            expires_at,
            remaining_points,
        })
    }
}
