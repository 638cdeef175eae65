use super::types::{AuthenticatedIdentity, RedirectTarget, SessionExchangeResult};

pub const DEFAULT_APP_LINK_BASE: &str = "https://pui.onelink.me/kFYQ";
pub const DEFAULT_REAUTH_PATH: &str = "pucreauth";

/// Builds the deep links that hand control to the mobile app.
#[derive(Debug, Clone)]
pub struct RedirectBuilder {
    app_link_base: String,
    reauth_path: String,
}

impl Default for RedirectBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_APP_LINK_BASE, DEFAULT_REAUTH_PATH)
    }
}

impl RedirectBuilder {
    pub fn new(app_link_base: impl Into<String>, reauth_path: impl Into<String>) -> Self {
        Self {
            app_link_base: app_link_base.into().trim_end_matches('/').to_string(),
            reauth_path: reauth_path.into().trim_matches('/').to_string(),
        }
    }

    /// `{base}/{path}?uid=..&token=..`, both values percent-encoded.
    pub fn build(
        &self,
        identity: &AuthenticatedIdentity,
        session: &SessionExchangeResult,
    ) -> RedirectTarget {
        RedirectTarget::new(format!(
            "{}/{}?uid={}&token={}",
            self.app_link_base,
            self.reauth_path,
            urlencoding::encode(&identity.uid),
            urlencoding::encode(&session.token),
        ))
    }

    /// Onboarding link for an inbound authorization `code`, forwarded as-is.
    ///
    /// No verification happens on this path. Returns `None` without a code.
    pub fn onboarding_link(&self, code: &str) -> Option<String> {
        if code.is_empty() {
            return None;
        }
        Some(format!("{}/?code={}", self.app_link_base, code))
    }

    /// Like [`onboarding_link`](Self::onboarding_link), reading `code` from a
    /// landing-page URL or its raw query string.
    pub fn onboarding_link_from_query(&self, url_or_query: &str) -> Option<String> {
        let query = match url::Url::parse(url_or_query) {
            Ok(parsed) => parsed.query().unwrap_or_default().to_string(),
            Err(_) => url_or_query.trim_start_matches('?').to_string(),
        };
        let code = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())?;
        self.onboarding_link(&code)
    }
}
