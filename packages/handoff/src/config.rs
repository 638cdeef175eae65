use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;

use crate::domains::auth::models::{PhoneNumber, DEFAULT_CALLING_CODE};

/// Which value the backend receives in the `email` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendEmailField {
    /// Always an empty placeholder
    #[default]
    Empty,
    /// The phone number the identity provider verified
    VerifiedPhone,
}

impl FromStr for BackendEmailField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" | "" => Ok(Self::Empty),
            "phone" | "verified_phone" => Ok(Self::VerifiedPhone),
            other => Err(anyhow!("unknown backend email field: {}", other)),
        }
    }
}

/// When the identity-provider session is signed out after a verified run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutTiming {
    /// Right after the backend exchange, before the redirect is shown
    OnVerified,
    /// When the user follows the redirect
    #[default]
    OnRedirect,
}

impl FromStr for SignOutTiming {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_verified" | "verified" => Ok(Self::OnVerified),
            "on_redirect" | "redirect" | "" => Ok(Self::OnRedirect),
            other => Err(anyhow!("unknown sign-out timing: {}", other)),
        }
    }
}

/// Timing constants and policy choices of the verification flow
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub calling_code: String,
    /// Drop a national trunk `0` when building the E.164 number
    pub drop_trunk_prefix: bool,
    /// Minimum wait between resend requests
    pub resend_cooldown: Duration,
    /// Delay between a completed code and its verification
    pub completion_debounce: Duration,
    pub sign_out_timing: SignOutTiming,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            calling_code: DEFAULT_CALLING_CODE.to_string(),
            drop_trunk_prefix: true,
            resend_cooldown: Duration::from_secs(60),
            completion_debounce: Duration::from_millis(300),
            sign_out_timing: SignOutTiming::default(),
        }
    }
}

impl FlowOptions {
    /// E.164 form of `phone` under these options.
    pub fn e164(&self, phone: &PhoneNumber) -> String {
        phone.to_e164(&self.calling_code, self.drop_trunk_prefix)
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub identity_api_key: String,
    pub identity_base_url: String,
    pub recaptcha_token: Option<String>,
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub app_link_base: String,
    pub app_reauth_path: String,
    pub calling_code: String,
    pub drop_trunk_prefix: bool,
    pub session_store_path: PathBuf,
    pub backend_email_field: BackendEmailField,
    pub sign_out_timing: SignOutTiming,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            identity_api_key: env::var("IDENTITY_API_KEY")
                .context("IDENTITY_API_KEY must be set")?,
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| identity_toolkit::DEFAULT_BASE_URL.to_string()),
            recaptcha_token: env::var("RECAPTCHA_TOKEN").ok(),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "https://panda.pucre.xyz/api/v1".to_string()),
            api_timeout: Duration::from_secs(
                env::var("API_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("API_TIMEOUT_SECS must be a valid number")?,
            ),
            app_link_base: env::var("APP_LINK_BASE")
                .unwrap_or_else(|_| "https://pui.onelink.me/kFYQ".to_string()),
            app_reauth_path: env::var("APP_REAUTH_PATH")
                .unwrap_or_else(|_| "pucreauth".to_string()),
            calling_code: env::var("CALLING_CODE")
                .unwrap_or_else(|_| DEFAULT_CALLING_CODE.to_string()),
            drop_trunk_prefix: env::var("DROP_TRUNK_PREFIX")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("DROP_TRUNK_PREFIX must be `true` or `false`")?,
            session_store_path: env::var("SESSION_STORE_PATH")
                .unwrap_or_else(|_| ".handoff-session.json".to_string())
                .into(),
            backend_email_field: env::var("BACKEND_EMAIL_FIELD")
                .unwrap_or_default()
                .parse()
                .context("BACKEND_EMAIL_FIELD must be `empty` or `phone`")?,
            sign_out_timing: env::var("SIGN_OUT_TIMING")
                .unwrap_or_default()
                .parse()
                .context("SIGN_OUT_TIMING must be `on_verified` or `on_redirect`")?,
        })
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            calling_code: self.calling_code.clone(),
            drop_trunk_prefix: self.drop_trunk_prefix,
            sign_out_timing: self.sign_out_timing,
            ..FlowOptions::default()
        }
    }
}
