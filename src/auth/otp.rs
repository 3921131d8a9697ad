use rand::Rng;
use time::{Duration, OffsetDateTime};

pub const OTP_TTL_MINUTES: i64 = 10;

/// Six digit code, uniform over [100000, 999999].
pub fn issue() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

pub fn expiry() -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::minutes(OTP_TTL_MINUTES)
}

/// Strict check: absent state or a past expiry never verifies, and the
/// provided code must match the stored one exactly.
pub fn verify(provided: &str, stored: Option<&str>, expires_at: Option<OffsetDateTime>) -> bool {
    let (Some(stored), Some(expires_at)) = (stored, expires_at) else {
        return false;
    };
    if OffsetDateTime::now_utc() > expires_at {
        return false;
    }
    provided == stored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_codes_are_six_digits_in_range() {
        for _ in 0..200 {
            let code = issue();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().expect("numeric");
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn matching_code_before_expiry_verifies() {
        let later = OffsetDateTime::now_utc() + Duration::minutes(5);
        assert!(verify("123456", Some("123456"), Some(later)));
    }

    #[test]
    fn mismatched_code_fails() {
        let later = OffsetDateTime::now_utc() + Duration::minutes(5);
        assert!(!verify("123457", Some("123456"), Some(later)));
    }

    #[test]
    fn expired_code_fails_even_when_matching() {
        let earlier = OffsetDateTime::now_utc() - Duration::minutes(1);
        assert!(!verify("123456", Some("123456"), Some(earlier)));
    }

    #[test]
    fn absent_state_fails() {
        let later = OffsetDateTime::now_utc() + Duration::minutes(5);
        assert!(!verify("123456", None, Some(later)));
        assert!(!verify("123456", Some("123456"), None));
        assert!(!verify("123456", None, None));
    }

    #[test]
    fn comparison_is_exact_no_normalization() {
        let later = OffsetDateTime::now_utc() + Duration::minutes(5);
        assert!(!verify(" 123456", Some("123456"), Some(later)));
        assert!(!verify("0123456", Some("123456"), Some(later)));
    }
}
