//! Auth domain - phone number verification via SMS one-time codes
//!
//! Responsibilities:
//! - Phone number parsing, formatting and hashing for logs
//! - Code dispatch behind the anti-abuse challenge
//! - The verification state machine and resend cooldown
//! - Exchanging the verified identity for an app session and the deep link

pub mod challenge;
pub mod cooldown;
pub mod coordinator;
pub mod errors;
pub mod models;
pub mod otp_entry;
pub mod redirect;
pub mod session;
pub mod types;

pub use challenge::ChallengeIssuer;
pub use cooldown::ResendCooldown;
pub use coordinator::{VerificationCoordinator, VerificationState};
pub use errors::{ErrorCategory, ProviderError, VerifyError};
pub use otp_entry::{EntryEvent, OtpEntryController};
pub use redirect::RedirectBuilder;
pub use session::VerificationSession;
pub use types::{
    AuthenticatedIdentity, ChallengeToken, RedirectTarget, SessionExchangeResult,
    VerificationHandle,
};
