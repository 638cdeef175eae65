// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no flow logic.
// The verification state machine lives in domains/auth and talks to the
// outside world exclusively through these traits.
//
// Naming convention: Base* for trait names (e.g., BaseIdentityProvider)

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::auth::errors::ProviderError;
use crate::domains::auth::models::OtpCode;
use crate::domains::auth::types::{
    AuthenticatedIdentity, ChallengeToken, SessionExchangeResult, VerificationHandle,
};

// =============================================================================
// Identity Provider Trait (Infrastructure - SMS/OTP)
// =============================================================================

#[async_trait]
pub trait BaseIdentityProvider: Send + Sync {
    /// Send an OTP via SMS to an E.164 phone number
    async fn send_otp(
        &self,
        phone_e164: &str,
        challenge: &ChallengeToken,
    ) -> std::result::Result<VerificationHandle, ProviderError>;

    /// Redeem an OTP for the identity it proves
    async fn redeem_otp(
        &self,
        handle: &VerificationHandle,
        code: &OtpCode,
    ) -> std::result::Result<AuthenticatedIdentity, ProviderError>;

    /// Terminate the provider-side session established by `redeem_otp`
    async fn sign_out(&self) -> std::result::Result<(), ProviderError>;
}

// =============================================================================
// Anti-abuse Challenge Traits (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseChallengeWidget: Send + Sync {
    /// Run the (normally invisible) challenge and return its token
    async fn solve(&self) -> Result<ChallengeToken>;

    /// Release widget resources. The widget is not used afterwards.
    fn clear(&self) {}
}

/// Creates challenge widgets. A widget that reported an error is never
/// reused, so the issuer asks for a fresh one.
pub trait ChallengeWidgetFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn BaseChallengeWidget>>;
}

// =============================================================================
// Backend Token Exchange Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseBackendExchange: Send + Sync {
    /// Trade a verified identity for an application session token
    async fn exchange(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> crate::domains::auth::errors::Result<SessionExchangeResult>;
}

// =============================================================================
// Session Storage Trait (Infrastructure - durable key/value strings)
// =============================================================================

pub trait BaseSessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
