//! Auth domain data types
//!
//! Values passed between the verification steps. Secrets (`id_token`,
//! `token`) are redacted from `Debug` output so they never reach the logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier binding a dispatched OTP to a phone number.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationHandle(String);

impl VerificationHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VerificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a short prefix; enough to correlate log lines.
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "VerificationHandle({}…)", prefix)
    }
}

/// Response produced by the anti-abuse challenge widget.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChallengeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChallengeToken(<redacted>)")
    }
}

/// Identity returned by the provider after a successful OTP redemption.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// Stable user identifier
    pub uid: String,
    /// Freshly minted identity token
    pub id_token: String,
    /// Phone number the provider verified, if it echoes one back
    pub phone_number: Option<String>,
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("uid", &self.uid)
            .field("id_token", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// Application session issued by the backend for an identity.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionExchangeResult {
    pub token: String,
    #[serde(default)]
    pub is_done_sign_in: bool,
}

impl fmt::Debug for SessionExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionExchangeResult")
            .field("token", &"<redacted>")
            .field("is_done_sign_in", &self.is_done_sign_in)
            .finish()
    }
}

/// Deep link that hands the verified identity to the mobile app.
#[derive(Clone, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    pub(crate) fn new(url: String) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.0.split('?').next().unwrap_or_default();
        write!(f, "RedirectTarget({}?…)", base)
    }
}
