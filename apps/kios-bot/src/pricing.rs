use crate::config::POINTS_PER_REDEEMED_DAY;

/// Durations on sale, with price in rupiah and the points the buyer earns.
pub const PRICE_TABLE: [(i32, i64, i64); 10] = [
    (1, 15_000, 1),
    (2, 30_000, 1),
    (3, 40_000, 2),
    (4, 50_000, 3),
    (6, 70_000, 4),
    (8, 90_000, 5),
    (10, 100_000, 6),
    (15, 150_000, 8),
    (20, 180_000, 10),
    (30, 250_000, 15),
];

pub fn price_for(duration_days: i32) -> Option<i64> {
    PRICE_TABLE
        .iter()
        .find(|(d, _, _)| *d == duration_days)
        .map(|(_, price, _)| *price)
}

pub fn points_earned_for(duration_days: i32) -> Option<i64> {
    PRICE_TABLE
        .iter()
        .find(|(d, _, _)| *d == duration_days)
        .map(|(_, _, pts)| *pts)
}

pub fn points_needed_for(duration_days: i32) -> i64 {
    duration_days as i64 * POINTS_PER_REDEEMED_DAY
}

/// "250000" as shown to users: "Rp 250.000".
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Compact price label for keyboard buttons ("15K", "250K").
pub fn short_price(amount: i64) -> String {
    format!("{}K", amount / 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_durations_have_prices() {
        assert_eq!(price_for(3), Some(40_000));
        assert_eq!(price_for(30), Some(250_000));
        assert_eq!(price_for(5), None);
    }

    #[test]
    fn earn_schedule_matches_price_table() {
        assert_eq!(points_earned_for(3), Some(2));
        assert_eq!(points_earned_for(30), Some(15));
        assert_eq!(points_earned_for(7), None);
    }

    #[test]
    fn redeem_cost_is_per_day() {
        assert_eq!(points_needed_for(7), 84);
        assert_eq!(points_needed_for(1), 12);
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(15_000), "Rp 15.000");
        assert_eq!(format_rupiah(250_000), "Rp 250.000");
        assert_eq!(format_rupiah(999), "Rp 999");
        assert_eq!(format_rupiah(1_000_000), "Rp 1.000.000");
    }

    #[test]
    fn short_labels() {
        assert_eq!(short_price(15_000), "15K");
        assert_eq!(short_price(250_000), "250K");
    }
}
