//! Small utility functions shared across the engine.
use chrono::{DateTime, Utc};
use rand::Rng;

// 32 symbols, no 0/O/1/I lookalikes. Order numbers get read out loud over a counter.
const ORDER_NUMBER_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

/// Generate a fresh order number, e.g. `BT-260815-7GQK2F`. Uniqueness is enforced by the
/// database; callers retry on a collision (the suffix space makes one vanishingly rare).
pub fn new_order_number<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let i = rng.gen_range(0..ORDER_NUMBER_ALPHABET.len());
            ORDER_NUMBER_ALPHABET[i] as char
        })
        .collect();
    format!("BT-{}-{suffix}", now.format("%y%m%d"))
}

/// Lower-case and trim an email address. The guest rate limiter and order attribution both key
/// on the normalized form, so `Ada@Example.com` and `ada@example.com ` are the same customer.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Promo codes are case-insensitive; they are stored and compared upper-cased.
pub fn normalize_promo_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 9, 30, 0).unwrap();
        let mut rng = rand::thread_rng();
        let n = new_order_number(now, &mut rng);
        assert!(n.starts_with("BT-260815-"));
        assert_eq!(n.len(), "BT-260815-".len() + ORDER_NUMBER_SUFFIX_LEN);
        assert!(n.bytes().skip(10).all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("tea.lover@shop.io"), "tea.lover@shop.io");
    }

    #[test]
    fn promo_code_normalization() {
        assert_eq!(normalize_promo_code(" boba10 "), "BOBA10");
        assert_eq!(normalize_promo_code("SUMMER"), "SUMMER");
    }
}
