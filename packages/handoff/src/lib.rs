// Phone Verification Handoff - Core
//
// Verifies a phone number with an SMS one-time code, trades the verified
// identity for an app session token, and hands off to the mobile app.
//
// Flow logic lives in domains/auth; infrastructure sits behind the traits
// in kernel/.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
