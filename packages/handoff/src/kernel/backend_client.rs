use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::BaseBackendExchange;
use crate::config::BackendEmailField;
use crate::domains::auth::errors::{Result, VerifyError};
use crate::domains::auth::types::{AuthenticatedIdentity, SessionExchangeResult};

/// Default timeout for backend requests.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct PhoneNumberSignInRequest<'a> {
    uid: &'a str,
    email: &'a str,
    screen_name: &'a str,
}

/// `{status, data: {token, is_done_sign_in}}`
#[derive(Debug, Deserialize)]
struct Envelope {
    status: u16,
    #[serde(default)]
    data: Option<SignInData>,
}

#[derive(Debug, Deserialize)]
struct SignInData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    is_done_sign_in: bool,
}

/// Backend Token Exchange Client
/// Trades a verified identity for the app's session token
pub struct BackendExchangeClient {
    client: Client,
    base_url: String,
    email_field: BackendEmailField,
}

impl BackendExchangeClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        email_field: BackendEmailField,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            email_field,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/phone_number_signin", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl BaseBackendExchange for BackendExchangeClient {
    async fn exchange(&self, identity: &AuthenticatedIdentity) -> Result<SessionExchangeResult> {
        let email = match self.email_field {
            BackendEmailField::Empty => "",
            BackendEmailField::VerifiedPhone => identity.phone_number.as_deref().unwrap_or(""),
        };
        let body = PhoneNumberSignInRequest {
            uid: &identity.uid,
            email,
            screen_name: "",
        };

        info!(uid = %identity.uid, "Exchanging verified identity for session token");

        let response = self
            .client
            .post(self.endpoint())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&identity.id_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Backend request failed: {}", e);
                VerifyError::BackendUnavailable(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VerifyError::BackendUnavailable(e.to_string()))?;

        if status.is_server_error() {
            error!("Backend error ({}): {}", status, text);
            return Err(VerifyError::BackendUnavailable(format!("HTTP {}", status)));
        }
        if status != StatusCode::OK {
            error!("Backend rejected sign-in ({}): {}", status, text);
            return Err(VerifyError::BackendRejected(status.as_u16()));
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse backend response: {}", e);
            VerifyError::MalformedResponse(e.to_string())
        })?;

        if envelope.status != 200 {
            error!("Backend sign-in failed: {}", text);
            return Err(VerifyError::BackendRejected(envelope.status));
        }

        let data = envelope
            .data
            .ok_or_else(|| VerifyError::MalformedResponse("missing data".to_string()))?;
        let token = data
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| VerifyError::MalformedResponse("missing token".to_string()))?;

        debug!(is_done_sign_in = data.is_done_sign_in, "Backend issued session token");

        Ok(SessionExchangeResult {
            token,
            is_done_sign_in: data.is_done_sign_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            uid: "uid-123".to_string(),
            id_token: "id-token".to_string(),
            phone_number: Some("+819012345678".to_string()),
        }
    }

    async fn create_test_client(email_field: BackendEmailField) -> (BackendExchangeClient, MockServer) {
        let mock_server = MockServer::start().await;
        let client = BackendExchangeClient::new(
            format!("{}/api/v1", mock_server.uri()),
            Duration::from_secs(5),
            email_field,
        )
        .unwrap();
        (client, mock_server)
    }

    #[tokio::test]
    async fn test_exchange_success() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .and(path("/api/v1/phone_number_signin"))
            .and(header("authorization", "Bearer id-token"))
            .and(body_json(serde_json::json!({
                "uid": "uid-123",
                "email": "",
                "screen_name": ""
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {"token": "abc", "is_done_sign_in": true}
            })))
            .mount(&mock_server)
            .await;

        let result = client.exchange(&identity()).await.unwrap();
        assert_eq!(result.token, "abc");
        assert!(result.is_done_sign_in);
    }

    #[tokio::test]
    async fn test_exchange_sends_verified_phone_when_configured() {
        let (client, mock_server) = create_test_client(BackendEmailField::VerifiedPhone).await;

        Mock::given(method("POST"))
            .and(path("/api/v1/phone_number_signin"))
            .and(body_json(serde_json::json!({
                "uid": "uid-123",
                "email": "+819012345678",
                "screen_name": ""
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {"token": "abc", "is_done_sign_in": false}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert!(client.exchange(&identity()).await.is_ok());
    }

    #[tokio::test]
    async fn test_payload_status_500_is_rejected() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": 500})),
            )
            .mount(&mock_server)
            .await;

        let err = client.exchange(&identity()).await.unwrap_err();
        assert_eq!(err, VerifyError::BackendRejected(500));
    }

    #[tokio::test]
    async fn test_http_server_error_is_unavailable() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = client.exchange(&identity()).await.unwrap_err();
        assert!(matches!(err, VerifyError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_http_client_error_is_rejected() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = client.exchange(&identity()).await.unwrap_err();
        assert_eq!(err, VerifyError::BackendRejected(401));
    }

    #[tokio::test]
    async fn test_missing_token_is_malformed() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {"is_done_sign_in": true}
            })))
            .mount(&mock_server)
            .await;

        let err = client.exchange(&identity()).await.unwrap_err();
        assert!(matches!(err, VerifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (client, mock_server) = create_test_client(BackendEmailField::Empty).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let err = client.exchange(&identity()).await.unwrap_err();
        assert!(matches!(err, VerifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = BackendExchangeClient::new(
            "http://127.0.0.1:9/api/v1",
            Duration::from_secs(2),
            BackendEmailField::Empty,
        )
        .unwrap();

        let err = client.exchange(&identity()).await.unwrap_err();
        assert!(matches!(err, VerifyError::BackendUnavailable(_)));
    }
}
