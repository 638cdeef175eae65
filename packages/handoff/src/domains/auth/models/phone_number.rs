use sha2::{Digest, Sha256};

use crate::domains::auth::errors::{Result, VerifyError};

/// Calling code used when none is configured.
pub const DEFAULT_CALLING_CODE: &str = "+81";

const MAX_DIGITS: usize = 11;

/// Phone number in national format, 10 or 11 digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    digits: String,
}

impl PhoneNumber {
    /// Parse user input, ignoring separators and other non-digits.
    pub fn parse(input: &str) -> Result<Self> {
        let digits = digits_of(input);
        if !(10..=MAX_DIGITS).contains(&digits.len()) {
            return Err(VerifyError::Validation(format!(
                "expected 10 or 11 digits, got {}",
                digits.len()
            )));
        }
        Ok(Self { digits })
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Display form, e.g. `090-1234-5678`.
    pub fn formatted(&self) -> String {
        format(&self.digits)
    }

    /// E.164 form. With `drop_trunk_prefix`, one leading `0` is dropped
    /// before the calling code is prefixed.
    pub fn to_e164(&self, calling_code: &str, drop_trunk_prefix: bool) -> String {
        let national = if drop_trunk_prefix {
            self.digits.strip_prefix('0').unwrap_or(&self.digits)
        } else {
            &self.digits
        };
        format!("+{}{}", calling_code.trim_start_matches('+'), national)
    }
}

fn digits_of(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format user input as `ddd-dddd-dddd`.
///
/// Non-digits are stripped and input is cut at 11 digits. Separators are
/// inserted only as far as digits exist: `090`, `090-1234`, `090-1234-5`.
pub fn format(input: &str) -> String {
    let digits: String = digits_of(input).chars().take(MAX_DIGITS).collect();
    match digits.len() {
        0..=3 => digits,
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
    }
}

/// True iff the input holds exactly 10 or 11 digits.
pub fn validate(input: &str) -> bool {
    PhoneNumber::parse(input).is_ok()
}

/// Hash a phone number using SHA256
///
/// Phone numbers are logged by hash only, never in plaintext.
pub fn hash_phone_number(phone_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mobile_number() {
        assert_eq!(format("09012345678"), "090-1234-5678");
    }

    #[test]
    fn test_format_partial_input() {
        assert_eq!(format(""), "");
        assert_eq!(format("09"), "09");
        assert_eq!(format("090"), "090");
        assert_eq!(format("0901"), "090-1");
        assert_eq!(format("0901234"), "090-1234");
        assert_eq!(format("09012345"), "090-1234-5");
    }

    #[test]
    fn test_format_strips_and_truncates() {
        assert_eq!(format("(090) 1234 5678 99"), "090-1234-5678");
        assert_eq!(format("abc"), "");
    }

    #[test]
    fn test_format_is_idempotent() {
        let inputs = [
            "", "0", "090", "0901", "0901234", "09012345", "0312345678", "09012345678",
            "090123456789", "+81 90-1234-5678", "tel:03 1234 5678",
        ];
        for input in inputs {
            let once = format(input);
            assert_eq!(format(&once), once, "format not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_validate_after_format_by_length() {
        for len in 0..=14 {
            let digits: String = (0..len).map(|i| char::from(b'0' + (i % 10) as u8)).collect();
            let formatted = format(&digits);
            // format truncates to 11 digits, so anything longer validates too
            assert_eq!(validate(&formatted), len >= 10, "len {len}");
            assert_eq!(validate(&digits), len == 10 || len == 11, "raw len {len}");
        }
    }

    #[test]
    fn test_parse_rejects_short_numbers() {
        let err = PhoneNumber::parse("090-1234").unwrap_err();
        assert!(matches!(err, VerifyError::Validation(_)));
    }

    #[test]
    fn test_to_e164_drops_trunk_prefix() {
        let phone = PhoneNumber::parse("090-1234-5678").unwrap();
        assert_eq!(phone.to_e164(DEFAULT_CALLING_CODE, true), "+819012345678");
        assert_eq!(phone.to_e164("81", true), "+819012345678");
        assert_eq!(phone.formatted(), "090-1234-5678");
    }

    #[test]
    fn test_to_e164_plain_prefix_keeps_trunk_zero() {
        let phone = PhoneNumber::parse("09012345678").unwrap();
        assert_eq!(phone.to_e164(DEFAULT_CALLING_CODE, false), "+8109012345678");

        let phone = PhoneNumber::parse("2025550123").unwrap();
        assert_eq!(phone.to_e164("+1", true), "+12025550123");
    }

    #[test]
    fn test_phone_hash_consistency() {
        let hash1 = hash_phone_number("+819012345678");
        let hash2 = hash_phone_number("+819012345678");
        assert_eq!(hash1, hash2, "Same phone should produce same hash");
        assert_ne!(hash1, hash_phone_number("+819087654321"));
        assert_eq!(hash1.len(), 64);
    }
}
