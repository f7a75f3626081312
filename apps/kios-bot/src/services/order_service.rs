use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use kios_db::models::order::{KeyType, OrderStatus, PendingOrder};
use kios_db::models::variant::GameVariant;
use kios_db::repositories::order_repo::NewOrder;
use kios_db::repositories::OrderRepository;
use tracing::{error, info};

use crate::config::ORDER_TIMEOUT_SECS;
use crate::credentials;
use crate::payment::{Deposit, DepositStatus, PaymentGateway};

/// What a manual payment check found.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Nothing pending for this chat.
    NoOrder,
    /// The payment window lapsed; the order was marked expired.
    Expired(PendingOrder),
    /// Gateway has not seen the money yet.
    StillPending { order: PendingOrder, remaining_secs: i64 },
    /// Paid, and this check won the claim; the caller must now deliver.
    Settled(PendingOrder),
    /// Paid, but a concurrent check already claimed the order.
    AlreadySettled,
}

#[derive(Clone)]
pub struct OrderService {
    orders: OrderRepository,
    gateway: Arc<dyn PaymentGateway>,
}

impl OrderService {
    pub fn new(orders: OrderRepository, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { orders, gateway }
    }

    /// Create a deposit with the gateway and persist the pending order with
    /// everything needed to settle later without re-asking the user.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        chat_id: i64,
        variant: GameVariant,
        duration_days: i32,
        amount: i64,
        key_type: KeyType,
        manual_username: Option<&str>,
        manual_password: Option<&str>,
    ) -> Result<(PendingOrder, Deposit)> {
        let prefix = match key_type {
            KeyType::Extend => "EXT",
            _ => "KIOS",
        };
        let order_id = credentials::new_order_id(prefix);

        let deposit = self
            .gateway
            .create_deposit(&order_id, amount)
            .await
            .context("Failed to create payment deposit")?;

        let order = self
            .orders
            .insert(NewOrder {
                order_id: &order_id,
                chat_id,
                variant,
                duration_days,
                amount,
                deposit_code: &deposit.deposit_code,
                key_type,
                manual_username,
                manual_password,
            })
            .await?;

        Ok((order, deposit))
    }

    /// One manual check of the chat's latest pending order. The expiry gate
    /// runs before the gateway poll, so a stale order is never settled even
    /// when the money did arrive late.
    pub async fn check(&self, chat_id: i64) -> Result<CheckOutcome> {
        let Some(order) = self.orders.latest_pending(chat_id).await? else {
            return Ok(CheckOutcome::NoOrder);
        };

        let now = Utc::now();
        if order.is_expired(now, ORDER_TIMEOUT_SECS) {
            self.orders.mark_status(order.id, OrderStatus::Expired).await?;
            info!(order_id = %order.order_id, "Order expired before payment");
            return Ok(CheckOutcome::Expired(order));
        }

        match self.gateway.deposit_status(&order.deposit_code).await? {
            DepositStatus::Unpaid => Ok(CheckOutcome::StillPending {
                remaining_secs: order.remaining_secs(now, ORDER_TIMEOUT_SECS),
                order,
            }),
            DepositStatus::Paid => {
                if self.orders.claim_completed(order.id).await? {
                    Ok(CheckOutcome::Settled(order))
                } else {
                    Ok(CheckOutcome::AlreadySettled)
                }
            }
        }
    }

    pub async fn cancel_latest(&self, chat_id: i64) -> Result<Option<PendingOrder>> {
        let Some(order) = self.orders.latest_pending(chat_id).await? else {
            return Ok(None);
        };
        self.orders.mark_status(order.id, OrderStatus::Cancelled).await?;
        info!(order_id = %order.order_id, "Order cancelled by user");
        Ok(Some(order))
    }

    /// Background sweep body. Errors are logged, never propagated, so one bad
    /// tick cannot kill the interval task.
    pub async fn sweep_expired(&self) {
        if let Err(e) = self.orders.sweep_expired(ORDER_TIMEOUT_SECS).await {
            error!("Expiry sweep failed: {:?}", e);
        }
    }
}
