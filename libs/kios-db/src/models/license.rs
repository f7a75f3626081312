use chrono::{DateTime, Duration, Utc};

/// Status code written into every freshly issued license row. The game-side
/// loader treats "2" as an active, unclaimed key.
pub const LICENSE_STATUS_ACTIVE: &str = "2";

#[derive(Debug, Clone)]
pub struct License {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub device_uuid: String,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

/// New expiry when an account is extended: an already-expired account starts
/// over from `now`, a live one gets the days appended to its current expiry.
pub fn rollover_expiry(current: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    if current < now {
        now + Duration::days(days)
    } else {
        current + Duration::days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expired_account_restarts_from_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(rollover_expiry(old, now, 3), now + Duration::days(3));
    }

    #[test]
    fn live_account_extends_current_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap();
        let current = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        assert_eq!(rollover_expiry(current, now, 5), expected);
    }
}
