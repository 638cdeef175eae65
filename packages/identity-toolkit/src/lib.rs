//! Phone sign-in against the Identity Toolkit REST API.
//!
//! Two calls make up the flow:
//! - `accounts:sendVerificationCode` dispatches an SMS and returns a `sessionInfo`
//! - `accounts:signInWithPhoneNumber` redeems `sessionInfo` + code for an ID token

pub mod error;
pub mod models;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

pub use crate::error::{IdentityToolkitError, Result};
use crate::models::{
    ErrorEnvelope, SendVerificationCodeRequest, SendVerificationCodeResponse,
    SignInWithPhoneNumberRequest, SignInWithPhoneNumberResponse,
};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Debug, Clone)]
pub struct IdentityToolkitOptions {
    pub api_key: String,
    pub base_url: String,
}

impl IdentityToolkitOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct IdentityToolkitService {
    options: IdentityToolkitOptions,
    client: Client,
}

impl IdentityToolkitService {
    pub fn new(options: IdentityToolkitOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{base}/v1/accounts:{method}",
            base = self.options.base_url.trim_end_matches('/'),
            method = method
        )
    }

    /// Dispatch an SMS code to `phone_number` (E.164).
    ///
    /// `recaptcha_token` is the anti-abuse challenge response.
    pub async fn send_verification_code(
        &self,
        phone_number: &str,
        recaptcha_token: &str,
    ) -> Result<SendVerificationCodeResponse> {
        let body = SendVerificationCodeRequest {
            phone_number: phone_number.to_string(),
            recaptcha_token: recaptcha_token.to_string(),
        };

        let res = self
            .client
            .post(self.endpoint("sendVerificationCode"))
            .query(&[("key", self.options.api_key.as_str())])
            .json(&body)
            .send()
            .await;

        match res {
            Ok(response) => parse_response(response).await,
            Err(e) => {
                error!("Request to identity toolkit failed: {}", e);
                Err(IdentityToolkitError::Network(e.to_string()))
            }
        }
    }

    /// Redeem the SMS `code` for the session returned by
    /// [`send_verification_code`](Self::send_verification_code).
    pub async fn sign_in_with_phone_number(
        &self,
        session_info: &str,
        code: &str,
    ) -> Result<SignInWithPhoneNumberResponse> {
        let body = SignInWithPhoneNumberRequest {
            session_info: session_info.to_string(),
            code: code.to_string(),
        };

        let res = self
            .client
            .post(self.endpoint("signInWithPhoneNumber"))
            .query(&[("key", self.options.api_key.as_str())])
            .json(&body)
            .send()
            .await;

        match res {
            Ok(response) => parse_response(response).await,
            Err(e) => {
                error!("Request to identity toolkit failed: {}", e);
                Err(IdentityToolkitError::Network(e.to_string()))
            }
        }
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| IdentityToolkitError::Network(e.to_string()))?;

    if !status.is_success() {
        debug!("Identity toolkit error ({}): {}", status, text);
        return match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => Err(IdentityToolkitError::Api {
                status: envelope.error.code,
                message: envelope.error.message,
            }),
            Err(_) => Err(IdentityToolkitError::Api {
                status: status.as_u16(),
                message: text,
            }),
        };
    }

    serde_json::from_str(&text).map_err(|e| {
        error!("Failed to parse identity toolkit response: {}", e);
        IdentityToolkitError::Parse(e.to_string())
    })
}
