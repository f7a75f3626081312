use chrono::{DateTime, Utc};
use std::str::FromStr;
use thiserror::Error;

use crate::models::variant::GameVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Debug, Error)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(String);

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}

/// Whether settled credentials are generated, user-supplied, or belong to an
/// extend of an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Random,
    Manual,
    Extend,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Random => "random",
            KeyType::Manual => "manual",
            KeyType::Extend => "extend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "random" => Some(KeyType::Random),
            "manual" => Some(KeyType::Manual),
            "extend" => Some(KeyType::Extend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub id: i64,
    pub order_id: String,
    pub chat_id: i64,
    pub variant: GameVariant,
    pub duration_days: i32,
    pub amount: i64,
    pub deposit_code: String,
    pub key_type: KeyType,
    pub manual_username: Option<String>,
    pub manual_password: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingOrder {
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout_secs: i64) -> bool {
        self.age_secs(now) > timeout_secs
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>, timeout_secs: i64) -> i64 {
        (timeout_secs - self.age_secs(now)).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order_created(secs_ago: i64) -> PendingOrder {
        let now = Utc::now();
        PendingOrder {
            id: 1,
            order_id: "KIOS1700000000123".to_string(),
            chat_id: 42,
            variant: GameVariant::Classic,
            duration_days: 3,
            amount: 40000,
            deposit_code: "D123".to_string(),
            key_type: KeyType::Random,
            manual_username: None,
            manual_password: None,
            status: OrderStatus::Pending,
            created_at: now - Duration::seconds(secs_ago),
            updated_at: now - Duration::seconds(secs_ago),
        }
    }

    #[test]
    fn order_inside_window_is_not_expired() {
        let o = order_created(599);
        assert!(!o.is_expired(Utc::now(), 600));
        assert!(o.remaining_secs(Utc::now(), 600) <= 1);
    }

    #[test]
    fn order_past_timeout_is_expired() {
        let o = order_created(601);
        assert!(o.is_expired(Utc::now(), 600));
        assert_eq!(o.remaining_secs(Utc::now(), 600), 0);
    }

    #[test]
    fn status_round_trips() {
        for st in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Expired,
        ] {
            assert_eq!(st.as_str().parse::<OrderStatus>().unwrap(), st);
        }
        assert!("paid".parse::<OrderStatus>().is_err());
    }
}
