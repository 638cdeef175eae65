use thiserror::Error;

/// Result type for the verification flow.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Error codes reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid-code")]
    InvalidCode,

    #[error("code-expired")]
    CodeExpired,

    #[error("too-many-requests")]
    TooManyRequests,

    #[error("invalid-phone-number")]
    InvalidPhoneNumber,

    #[error("challenge-failed")]
    ChallengeFailed,

    /// Transport failure or an error code outside the contract
    #[error("provider error: {0}")]
    Other(String),
}

/// Errors raised by the phone verification flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Invalid phone number: {0}")]
    Validation(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Phone number rejected by identity provider")]
    InvalidPhoneNumber,

    #[error("Anti-abuse challenge failed")]
    ChallengeFailed,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("No verification in progress")]
    MissingVerificationContext,

    #[error("Backend rejected sign-in with status {0}")]
    BackendRejected(u16),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Resend available in {0}s")]
    CooldownActive(u64),

    #[error("Verification already in progress")]
    VerifyInFlight,

    #[error("Operation not allowed while {0}")]
    InvalidState(&'static str),

    #[error("Verification abandoned before the result arrived")]
    Abandoned,

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// User-facing grouping of [`VerifyError`]. One message per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    RateLimited,
    InvalidCredentialInput,
    ProviderUnavailable,
    MissingVerificationContext,
    BackendRejected,
    BackendUnavailable,
    LocalState,
}

impl VerifyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VerifyError::Validation(_) | VerifyError::InvalidPhoneNumber => {
                ErrorCategory::Validation
            }
            VerifyError::RateLimited => ErrorCategory::RateLimited,
            VerifyError::InvalidCode | VerifyError::CodeExpired => {
                ErrorCategory::InvalidCredentialInput
            }
            VerifyError::ChallengeFailed | VerifyError::Provider(_) => {
                ErrorCategory::ProviderUnavailable
            }
            VerifyError::MissingVerificationContext => ErrorCategory::MissingVerificationContext,
            VerifyError::BackendRejected(_) | VerifyError::MalformedResponse(_) => {
                ErrorCategory::BackendRejected
            }
            VerifyError::BackendUnavailable(_) => ErrorCategory::BackendUnavailable,
            VerifyError::CooldownActive(_)
            | VerifyError::VerifyInFlight
            | VerifyError::InvalidState(_)
            | VerifyError::Abandoned
            | VerifyError::Storage(_) => ErrorCategory::LocalState,
        }
    }

    /// Localized, non-technical message shown to the user.
    ///
    /// The technical error is logged separately; this never includes it.
    pub fn user_message(&self) -> &'static str {
        match self {
            VerifyError::InvalidCode => "認証コードが正しくありません",
            VerifyError::CodeExpired => "認証コードの有効期限が切れています",
            VerifyError::CooldownActive(_) => "しばらく待ってから再送信してください",
            _ => match self.category() {
                ErrorCategory::Validation => "電話番号を正しく入力してください",
                ErrorCategory::RateLimited => {
                    "リクエストが多すぎます。しばらくしてからもう一度お試しください。"
                }
                ErrorCategory::MissingVerificationContext => {
                    "認証情報が見つかりません。もう一度SMSを送信してください。"
                }
                _ => "認証に失敗しました。もう一度お試しください。",
            },
        }
    }

    /// Whether the user should be steered towards requesting a new code.
    pub fn recommends_resend(&self) -> bool {
        matches!(
            self,
            VerifyError::CodeExpired | VerifyError::MissingVerificationContext
        )
    }
}

impl From<ProviderError> for VerifyError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCode => VerifyError::InvalidCode,
            ProviderError::CodeExpired => VerifyError::CodeExpired,
            ProviderError::TooManyRequests => VerifyError::RateLimited,
            ProviderError::InvalidPhoneNumber => VerifyError::InvalidPhoneNumber,
            ProviderError::ChallengeFailed => VerifyError::ChallengeFailed,
            ProviderError::Other(message) => VerifyError::Provider(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_codes_map_to_taxonomy() {
        assert_eq!(
            VerifyError::from(ProviderError::InvalidCode),
            VerifyError::InvalidCode
        );
        assert_eq!(
            VerifyError::from(ProviderError::CodeExpired),
            VerifyError::CodeExpired
        );
        assert_eq!(
            VerifyError::from(ProviderError::TooManyRequests),
            VerifyError::RateLimited
        );
        assert_eq!(
            VerifyError::from(ProviderError::ChallengeFailed),
            VerifyError::ChallengeFailed
        );
        assert_eq!(
            VerifyError::from(ProviderError::Other("internal-error".to_string())),
            VerifyError::Provider("internal-error".to_string())
        );
    }

    #[test]
    fn test_credential_errors_share_category() {
        assert_eq!(
            VerifyError::InvalidCode.category(),
            ErrorCategory::InvalidCredentialInput
        );
        assert_eq!(
            VerifyError::CodeExpired.category(),
            ErrorCategory::InvalidCredentialInput
        );
    }

    #[test]
    fn test_user_message_hides_technical_detail() {
        let err = VerifyError::BackendUnavailable("connection reset by peer".to_string());
        assert!(!err.user_message().contains("connection"));
        assert_eq!(
            err.user_message(),
            VerifyError::BackendRejected(500).user_message()
        );
    }

    #[test]
    fn test_expired_code_recommends_resend() {
        assert!(VerifyError::CodeExpired.recommends_resend());
        assert!(!VerifyError::InvalidCode.recommends_resend());
    }
}
