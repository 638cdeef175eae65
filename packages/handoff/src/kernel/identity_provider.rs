use std::sync::Mutex;

use async_trait::async_trait;
use identity_toolkit::{IdentityToolkitError, IdentityToolkitService};
use tracing::{debug, info};

use super::BaseIdentityProvider;
use crate::domains::auth::errors::ProviderError;
use crate::domains::auth::models::OtpCode;
use crate::domains::auth::types::{AuthenticatedIdentity, ChallengeToken, VerificationHandle};

/// The signed-in user, held until `sign_out`.
struct SignedInUser {
    uid: String,
}

/// [`BaseIdentityProvider`] backed by the Identity Toolkit REST API.
///
/// The provider's `sessionInfo` is the verification handle. Signing out
/// is local: the signed-in user is forgotten.
pub struct IdentityToolkitProvider {
    service: IdentityToolkitService,
    current_user: Mutex<Option<SignedInUser>>,
}

impl IdentityToolkitProvider {
    pub fn new(service: IdentityToolkitService) -> Self {
        Self {
            service,
            current_user: Mutex::new(None),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Map an API reason (`INVALID_CODE`, ...) onto the provider contract.
pub fn map_toolkit_error(err: &IdentityToolkitError) -> ProviderError {
    match err.reason() {
        Some("INVALID_CODE") => ProviderError::InvalidCode,
        Some("SESSION_EXPIRED") | Some("INVALID_SESSION_INFO") => ProviderError::CodeExpired,
        Some("TOO_MANY_ATTEMPTS_TRY_LATER") | Some("QUOTA_EXCEEDED") => {
            ProviderError::TooManyRequests
        }
        Some("INVALID_PHONE_NUMBER") | Some("MISSING_PHONE_NUMBER") => {
            ProviderError::InvalidPhoneNumber
        }
        Some("CAPTCHA_CHECK_FAILED") | Some("MISSING_RECAPTCHA_TOKEN") => {
            ProviderError::ChallengeFailed
        }
        _ => ProviderError::Other(err.to_string()),
    }
}

#[async_trait]
impl BaseIdentityProvider for IdentityToolkitProvider {
    async fn send_otp(
        &self,
        phone_e164: &str,
        challenge: &ChallengeToken,
    ) -> Result<VerificationHandle, ProviderError> {
        let response = self
            .service
            .send_verification_code(phone_e164, challenge.as_str())
            .await
            .map_err(|e| map_toolkit_error(&e))?;

        debug!("Identity toolkit issued verification session");
        Ok(VerificationHandle::new(response.session_info))
    }

    async fn redeem_otp(
        &self,
        handle: &VerificationHandle,
        code: &OtpCode,
    ) -> Result<AuthenticatedIdentity, ProviderError> {
        let response = self
            .service
            .sign_in_with_phone_number(handle.as_str(), code.as_str())
            .await
            .map_err(|e| map_toolkit_error(&e))?;

        info!(uid = %response.local_id, new_user = response.is_new_user, "Phone sign-in succeeded");

        *self.current_user.lock().unwrap_or_else(|e| e.into_inner()) = Some(SignedInUser {
            uid: response.local_id.clone(),
        });

        Ok(AuthenticatedIdentity {
            uid: response.local_id,
            id_token: response.id_token,
            phone_number: response.phone_number,
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let previous = self
            .current_user
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(user) = previous {
            info!(uid = %user.uid, "Signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity_toolkit::IdentityToolkitOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_error(message: &str) -> IdentityToolkitError {
        IdentityToolkitError::Api {
            status: 400,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_map_toolkit_error_codes() {
        assert_eq!(map_toolkit_error(&api_error("INVALID_CODE")), ProviderError::InvalidCode);
        assert_eq!(map_toolkit_error(&api_error("SESSION_EXPIRED")), ProviderError::CodeExpired);
        assert_eq!(
            map_toolkit_error(&api_error("TOO_MANY_ATTEMPTS_TRY_LATER")),
            ProviderError::TooManyRequests
        );
        assert_eq!(
            map_toolkit_error(&api_error("INVALID_PHONE_NUMBER : TOO_SHORT")),
            ProviderError::InvalidPhoneNumber
        );
        assert_eq!(
            map_toolkit_error(&api_error("CAPTCHA_CHECK_FAILED")),
            ProviderError::ChallengeFailed
        );
        assert!(matches!(
            map_toolkit_error(&IdentityToolkitError::Network("timeout".to_string())),
            ProviderError::Other(_)
        ));
    }

    #[tokio::test]
    async fn test_redeem_then_sign_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPhoneNumber"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "idToken": "id-token",
                "localId": "uid-123",
                "phoneNumber": "+819012345678"
            })))
            .mount(&mock_server)
            .await;

        let provider = IdentityToolkitProvider::new(IdentityToolkitService::new(
            IdentityToolkitOptions::new("key").with_base_url(mock_server.uri()),
        ));

        let identity = provider
            .redeem_otp(
                &VerificationHandle::new("session-1"),
                &OtpCode::parse("123456").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(identity.uid, "uid-123");
        assert!(provider.is_signed_in());

        provider.sign_out().await.unwrap();
        assert!(!provider.is_signed_in());
    }
}
