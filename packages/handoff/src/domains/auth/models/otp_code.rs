use std::fmt;

use crate::domains::auth::errors::{Result, VerifyError};

/// Number of digits in an SMS code.
pub const OTP_LENGTH: usize = 6;

/// A complete six-digit code, ready to be redeemed.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Accepts exactly six ASCII digits and nothing else.
    pub fn parse(input: &str) -> Result<Self> {
        if input.len() == OTP_LENGTH && input.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(input.to_string()))
        } else {
            Err(VerifyError::InvalidCode)
        }
    }

    pub(crate) fn from_cells(cells: &[Option<char>; OTP_LENGTH]) -> Option<Self> {
        cells
            .iter()
            .copied()
            .collect::<Option<String>>()
            .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}
