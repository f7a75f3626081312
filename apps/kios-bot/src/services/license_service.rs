use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use kios_db::models::order::{KeyType, PendingOrder};
use kios_db::models::points::RedeemTxOutcome;
use kios_db::models::variant::GameVariant;
use kios_db::repositories::{LicenseRepository, PointsRepository};
use tracing::warn;

use crate::credentials::{self, Credentials};
use crate::pricing;

/// Attempts at generating a non-colliding redeem username before giving up.
const REDEEM_USERNAME_ATTEMPTS: usize = 10;

/// A settled fresh purchase, ready to present to the buyer.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub credentials: Credentials,
    pub expires_at: DateTime<Utc>,
    pub points_earned: i64,
    pub new_point_balance: i64,
}

#[derive(Debug, Clone)]
pub struct ExtendedLicense {
    pub new_expiry: DateTime<Utc>,
    pub points_earned: i64,
    pub new_point_balance: i64,
}

#[derive(Debug)]
pub enum RedeemOutcome {
    InsufficientPoints { have: i64, needed: i64 },
    UsernamePoolExhausted,
    Redeemed {
        credentials: Credentials,
        expires_at: DateTime<Utc>,
        remaining_points: i64,
    },
}

#[derive(Clone)]
pub struct LicenseService {
    licenses: LicenseRepository,
    points: PointsRepository,
}

impl LicenseService {
    pub fn new(licenses: LicenseRepository, points: PointsRepository) -> Self {
        Self { licenses, points }
    }

    pub async fn username_taken(&self, variant: GameVariant, username: &str) -> Result<bool> {
        self.licenses.username_exists(variant, username).await
    }

    pub async fn find_license(
        &self,
        variant: GameVariant,
        username: &str,
        password: &str,
    ) -> Result<Option<kios_db::models::license::License>> {
        self.licenses.find_by_credentials(variant, username, password).await
    }

    /// Deliver a paid fresh purchase: insert the license and credit the
    /// buyer's earned points.
    pub async fn issue_purchase(&self, order: &PendingOrder) -> Result<IssuedLicense> {
        let creds = match order.key_type {
            KeyType::Manual => {
                let username = order
                    .manual_username
                    .clone()
                    .ok_or_else(|| anyhow!("Manual order {} has no username", order.order_id))?;
                let password = order
                    .manual_password
                    .clone()
                    .ok_or_else(|| anyhow!("Manual order {} has no password", order.order_id))?;
                if self.licenses.username_exists(order.variant, &username).await? {
                    // Someone claimed the name while the QR sat unpaid.
                    return Err(anyhow!(
                        "Username {} was taken while order {} awaited payment",
                        username,
                        order.order_id
                    ));
                }
                Credentials { username, password }
            }
            KeyType::Random => credentials::generate_random(),
            KeyType::Extend => {
                return Err(anyhow!("Extend order {} routed to issue_purchase", order.order_id))
            }
        };

        self.licenses
            .insert(
                order.variant,
                &creds.username,
                &creds.password,
                order.duration_days as i64,
                &order.order_id,
            )
            .await?;

        let points_earned = pricing::points_earned_for(order.duration_days).unwrap_or(0);
        let new_point_balance = self
            .points
            .credit(order.chat_id, points_earned, &order.order_id)
            .await?;

        Ok(IssuedLicense {
            expires_at: Utc::now() + chrono::Duration::days(order.duration_days as i64),
            credentials: creds,
            points_earned,
            new_point_balance,
        })
    }

    /// Deliver a paid extend: roll the expiry forward and credit points.
    pub async fn apply_extend(&self, order: &PendingOrder) -> Result<ExtendedLicense> {
        let username = order
            .manual_username
            .clone()
            .ok_or_else(|| anyhow!("Extend order {} has no username", order.order_id))?;
        let password = order
            .manual_password
            .clone()
            .ok_or_else(|| anyhow!("Extend order {} has no password", order.order_id))?;

        let license = self
            .licenses
            .find_by_credentials(order.variant, &username, &password)
            .await?
            .ok_or_else(|| {
                anyhow!("Account for extend order {} no longer exists", order.order_id)
            })?;

        let new_expiry = self
            .licenses
            .extend(
                order.variant,
                license.id,
                license.expires_at,
                order.duration_days as i64,
            )
            .await?;

        let points_earned = pricing::points_earned_for(order.duration_days).unwrap_or(0);
        let new_point_balance = self
            .points
            .credit(order.chat_id, points_earned, &order.order_id)
            .await?;

        Ok(ExtendedLicense {
            new_expiry,
            points_earned,
            new_point_balance,
        })
    }

    /// Spend points on a free account. Username generation retries on
    /// collision up to a fixed cap; the debit and insert commit atomically.
    pub async fn redeem(
        &self,
        chat_id: i64,
        variant: GameVariant,
        duration_days: i32,
        points_needed: i64,
    ) -> Result<RedeemOutcome> {
        let mut creds = None;
        for _ in 0..REDEEM_USERNAME_ATTEMPTS {
            let candidate = credentials::generate_redeem();
            if !self.licenses.username_exists(variant, &candidate.username).await? {
                creds = Some(candidate);
                break;
            }
        }
        let Some(creds) = creds else {
            warn!(chat_id, "Could not find a free redeem username");
            return Ok(RedeemOutcome::UsernamePoolExhausted);
        };

        let reference = credentials::new_order_id("RDM");
        match self
            .licenses
            .redeem_into_license(
                variant,
                chat_id,
                points_needed,
                &creds.username,
                &creds.password,
                duration_days as i64,
                &reference,
            )
            .await?
        {
            RedeemTxOutcome::InsufficientPoints { have } => Ok(RedeemOutcome::InsufficientPoints {
                have,
                needed: points_needed,
            }),
            RedeemTxOutcome::Created { expires_at, remaining_points } => {
                Ok(RedeemOutcome::Redeemed {
                    credentials: creds,
                    expires_at,
                    remaining_points,
                })
            }
        }
    }
}
