use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct PointBalance {
    pub chat_id: i64,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PointBalance {
    pub fn can_afford(&self, needed: i64) -> bool {
        self.points >= needed
    }

    /// Remaining points after paying `needed`, or `None` when the balance
    /// falls short. Same rule the conditional debit enforces at commit time.
    pub fn try_debit(&self, needed: i64) -> Option<i64> {
        if self.can_afford(needed) {
            Some(self.points - needed)
        } else {
            None
        }
    }
}

/// Result of the atomic redeem transaction (point debit + license insert).
/// The debit applies the [`PointBalance::try_debit`] rule inside the
/// transaction, so a stale pre-check cannot overdraw the balance.
#[derive(Debug, Clone)]
pub enum RedeemTxOutcome {
    /// The conditional debit matched no row: balance below the required
    /// amount at commit time.
    InsufficientPoints { have: i64 },
    Created {
        expires_at: DateTime<Utc>,
        remaining_points: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_of(points: i64) -> PointBalance {
        PointBalance {
            chat_id: 1,
            points,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn one_point_short_is_rejected() {
        let b = balance_of(83);
        assert!(!b.can_afford(84));
        assert_eq!(b.try_debit(84), None);
    }

    #[test]
    fn exact_balance_is_accepted_and_drained() {
        let b = balance_of(84);
        assert!(b.can_afford(84));
        assert_eq!(b.try_debit(84), Some(0));
    }

    #[test]
    fn surplus_balance_keeps_the_change() {
        assert_eq!(balance_of(100).try_debit(84), Some(16));
    }
}
