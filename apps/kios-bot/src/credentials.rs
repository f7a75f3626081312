use chrono::Utc;
use rand::Rng;

/// Username and password pair handed out after a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Short generated login for paid accounts: two uppercase letters plus two
/// digits, with a two-digit password.
pub fn generate_random() -> Credentials {
    let mut rng = rand::thread_rng();
    let letters: String = (0..2).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
    let digits: String = (0..2).map(|_| rng.gen_range(0..10).to_string()).collect();
    Credentials {
        username: format!("{}{}", letters, digits),
        password: format!("{}{}", rng.gen_range(0..10), rng.gen_range(0..10)),
    }
}

/// Login for point-redeemed accounts, visually distinct from paid ones.
pub fn generate_redeem() -> Credentials {
    let mut rng = rand::thread_rng();
    let lowers: String = (0..2).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
    Credentials {
        username: format!("redeem{}{}", rng.gen_range(0..10), lowers),
        password: rng.gen_range(0..10).to_string(),
    }
}

/// Parse a user-chosen "/username-password" message. The leading slash keeps
/// the text from being mistaken for chatter; the first dash splits the two
/// parts so passwords may themselves contain dashes.
pub fn parse_manual(text: &str) -> Option<Credentials> {
    let rest = text.strip_prefix('/')?;
    let (username, password) = rest.split_once('-')?;
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Merchant-side order reference: prefix, unix timestamp, three random digits.
pub fn new_order_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}{}{}", prefix, Utc::now().timestamp(), rng.gen_range(100..=999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_credentials_have_expected_shape() {
        for _ in 0..50 {
            let c = generate_random();
            assert_eq!(c.username.len(), 4);
            assert!(c.username[..2].chars().all(|ch| ch.is_ascii_uppercase()));
            assert!(c.username[2..].chars().all(|ch| ch.is_ascii_digit()));
            assert_eq!(c.password.len(), 2);
            assert!(c.password.chars().all(|ch| ch.is_ascii_digit()));
        }
    }

    #[test]
    fn redeem_credentials_have_expected_shape() {
        for _ in 0..50 {
            let c = generate_redeem();
            assert!(c.username.starts_with("redeem"));
            assert_eq!(c.username.len(), 9);
            assert!(c.username.as_bytes()[6].is_ascii_digit());
            assert!(c.username[7..].chars().all(|ch| ch.is_ascii_lowercase()));
            assert_eq!(c.password.len(), 1);
        }
    }

    #[test]
    fn manual_input_parses() {
        let c = parse_manual("/alice-secret").unwrap();
        assert_eq!(c.username, "alice");
        assert_eq!(c.password, "secret");
    }

    #[test]
    fn manual_input_trims_and_keeps_dashes_in_password() {
        let c = parse_manual("/ bob - pass-word ").unwrap();
        assert_eq!(c.username, "bob");
        assert_eq!(c.password, "pass-word");
    }

    #[test]
    fn manual_input_rejects_bad_shapes() {
        assert_eq!(parse_manual("alice-secret"), None);
        assert_eq!(parse_manual("/alicesecret"), None);
        assert_eq!(parse_manual("/-secret"), None);
        assert_eq!(parse_manual("/alice-"), None);
        assert_eq!(parse_manual("/ - "), None);
    }

    #[test]
    fn order_ids_carry_prefix() {
        let id = new_order_id("KIOS");
        assert!(id.starts_with("KIOS"));
        assert!(id.len() > 10);
        assert!(id["KIOS".len()..].chars().all(|ch| ch.is_ascii_digit()));
    }
}
