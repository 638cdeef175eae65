//! OTP dispatch behind the anti-abuse challenge.
//!
//! The issuer owns two pieces of process-scoped state: the challenge widget
//! (created lazily, reused, torn down after an error) and the single live
//! verification handle.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use super::errors::{Result, VerifyError};
use super::models::{hash_phone_number, OtpCode};
use super::types::{AuthenticatedIdentity, VerificationHandle};
use crate::kernel::{BaseChallengeWidget, BaseIdentityProvider, ChallengeWidgetFactory};

pub struct ChallengeIssuer {
    provider: Arc<dyn BaseIdentityProvider>,
    widgets: Arc<dyn ChallengeWidgetFactory>,
    widget: Mutex<Option<Arc<dyn BaseChallengeWidget>>>,
    live: Mutex<Option<VerificationHandle>>,
}

impl ChallengeIssuer {
    pub fn new(
        provider: Arc<dyn BaseIdentityProvider>,
        widgets: Arc<dyn ChallengeWidgetFactory>,
    ) -> Self {
        Self {
            provider,
            widgets,
            widget: Mutex::new(None),
            live: Mutex::new(None),
        }
    }

    /// Solve the challenge and send a code to `phone_e164`.
    pub async fn dispatch(&self, phone_e164: &str) -> Result<VerificationHandle> {
        let phone_hash = hash_phone_number(phone_e164);
        let result = self.request_code(phone_e164).await;
        match &result {
            Ok(_) => info!(%phone_hash, "Verification code sent"),
            Err(e) => error!(%phone_hash, "Failed to send verification code: {}", e),
        }
        result
    }

    /// Send a fresh code, replacing the live handle.
    ///
    /// Any failure discards the widget so the next attempt starts clean.
    pub async fn reissue(&self, phone_e164: &str) -> Result<VerificationHandle> {
        let phone_hash = hash_phone_number(phone_e164);
        match self.request_code(phone_e164).await {
            Ok(handle) => {
                info!(%phone_hash, "Verification code resent");
                Ok(handle)
            }
            Err(e) => {
                error!(%phone_hash, "Failed to resend verification code: {}", e);
                self.teardown_widget();
                Err(e)
            }
        }
    }

    async fn request_code(&self, phone_e164: &str) -> Result<VerificationHandle> {
        let widget = self.widget()?;

        let token = match widget.solve().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Challenge widget failed: {:#}", e);
                self.teardown_widget();
                return Err(VerifyError::ChallengeFailed);
            }
        };

        match self.provider.send_otp(phone_e164, &token).await {
            Ok(handle) => {
                // The previous handle is dead from here on.
                *self.live.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                let err = VerifyError::from(e);
                if err == VerifyError::ChallengeFailed {
                    self.teardown_widget();
                }
                Err(err)
            }
        }
    }

    /// Redeem `code` against `handle`.
    ///
    /// Only the live handle is accepted; a superseded one fails as expired
    /// without reaching the provider.
    pub async fn redeem(
        &self,
        handle: &VerificationHandle,
        code: &OtpCode,
    ) -> Result<AuthenticatedIdentity> {
        if !self.is_live(handle) {
            warn!(?handle, "Rejecting code for a superseded verification handle");
            return Err(VerifyError::CodeExpired);
        }

        self.provider.redeem_otp(handle, code).await.map_err(|e| {
            warn!(?handle, "Code redemption failed: {}", e);
            VerifyError::from(e)
        })
    }

    /// Adopt a handle restored from storage as the live one.
    pub fn adopt(&self, handle: VerificationHandle) {
        *self.live.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Forget the live handle (consumed or expired).
    pub fn retire(&self) {
        *self.live.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// The handle the provider last issued or that was adopted.
    pub fn live(&self) -> Option<VerificationHandle> {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_live(&self, handle: &VerificationHandle) -> bool {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            == Some(handle)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await.map_err(VerifyError::from)
    }

    fn widget(&self) -> Result<Arc<dyn BaseChallengeWidget>> {
        let mut slot = self.widget.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(widget) = slot.as_ref() {
            return Ok(widget.clone());
        }
        let widget = self.widgets.create().map_err(|e| {
            error!("Failed to create challenge widget: {:#}", e);
            VerifyError::ChallengeFailed
        })?;
        debug!("Challenge widget created");
        *slot = Some(widget.clone());
        Ok(widget)
    }

    /// Drop the widget; the next dispatch creates a new one.
    pub fn teardown_widget(&self) {
        let previous = self
            .widget
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(widget) = previous {
            widget.clear();
            debug!("Challenge widget torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::errors::ProviderError;
    use crate::kernel::test_dependencies::{MockChallengeFactory, MockIdentityProvider};

    fn issuer(
        provider: &Arc<MockIdentityProvider>,
        widgets: &Arc<MockChallengeFactory>,
    ) -> ChallengeIssuer {
        ChallengeIssuer::new(provider.clone(), widgets.clone())
    }

    fn code(value: &str) -> OtpCode {
        OtpCode::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_widget_is_created_once_and_reused() {
        let provider = Arc::new(MockIdentityProvider::new());
        let widgets = Arc::new(MockChallengeFactory::new());
        let issuer = issuer(&provider, &widgets);

        issuer.dispatch("+819012345678").await.unwrap();
        issuer.reissue("+819012345678").await.unwrap();

        assert_eq!(widgets.created_count(), 1);
        assert_eq!(widgets.solve_count(), 2);
        assert_eq!(provider.sent_to(), vec!["+819012345678", "+819012345678"]);
    }

    #[tokio::test]
    async fn test_failed_widget_is_recreated() {
        let provider = Arc::new(MockIdentityProvider::new());
        let widgets = Arc::new(MockChallengeFactory::new().with_failing_solves(1));
        let issuer = issuer(&provider, &widgets);

        let err = issuer.dispatch("+819012345678").await.unwrap_err();
        assert_eq!(err, VerifyError::ChallengeFailed);
        assert!(provider.sent_to().is_empty(), "no SMS without a solved challenge");
        assert_eq!(widgets.cleared_count(), 1);

        issuer.dispatch("+819012345678").await.unwrap();
        assert_eq!(widgets.created_count(), 2);
    }

    #[tokio::test]
    async fn test_reissue_failure_discards_widget() {
        let provider = Arc::new(
            MockIdentityProvider::new().with_send_error(ProviderError::TooManyRequests),
        );
        let widgets = Arc::new(MockChallengeFactory::new());
        let issuer = issuer(&provider, &widgets);

        let err = issuer.reissue("+819012345678").await.unwrap_err();
        assert_eq!(err, VerifyError::RateLimited);
        assert_eq!(widgets.cleared_count(), 1);

        issuer.reissue("+819012345678").await.unwrap();
        assert_eq!(widgets.created_count(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_provider_error_keeps_widget() {
        let provider = Arc::new(
            MockIdentityProvider::new().with_send_error(ProviderError::InvalidPhoneNumber),
        );
        let widgets = Arc::new(MockChallengeFactory::new());
        let issuer = issuer(&provider, &widgets);

        let err = issuer.dispatch("+8190").await.unwrap_err();
        assert_eq!(err, VerifyError::InvalidPhoneNumber);
        assert_eq!(widgets.cleared_count(), 0);
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_handle() {
        let provider = Arc::new(MockIdentityProvider::new().with_valid_code("123456"));
        let widgets = Arc::new(MockChallengeFactory::new());
        let issuer = issuer(&provider, &widgets);

        let first = issuer.dispatch("+819012345678").await.unwrap();
        let second = issuer.reissue("+819012345678").await.unwrap();
        assert_ne!(first, second);

        let err = issuer.redeem(&first, &code("123456")).await.unwrap_err();
        assert_eq!(err, VerifyError::CodeExpired);
        assert!(provider.redeemed().is_empty(), "stale handle never reaches provider");

        let identity = issuer.redeem(&second, &code("123456")).await.unwrap();
        assert!(!identity.uid.is_empty());
    }

    #[tokio::test]
    async fn test_adopted_handle_is_live() {
        let provider = Arc::new(MockIdentityProvider::new().with_valid_code("123456"));
        let widgets = Arc::new(MockChallengeFactory::new());
        let issuer = issuer(&provider, &widgets);

        let handle = VerificationHandle::new("restored");
        assert!(!issuer.is_live(&handle));
        issuer.adopt(handle.clone());
        assert!(issuer.is_live(&handle));
        assert_eq!(issuer.live(), Some(handle.clone()));

        issuer.retire();
        assert!(!issuer.is_live(&handle));
        assert_eq!(issuer.live(), None);
    }
}
