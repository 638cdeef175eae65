//! Production dependencies for the verification flow
//!
//! Wires the real identity provider, challenge widget, backend client and
//! session store behind their traits, so the coordinator never sees concrete
//! infrastructure.

use anyhow::{Context, Result};
use identity_toolkit::{IdentityToolkitOptions, IdentityToolkitService};
use std::sync::Arc;

use crate::config::Config;
use crate::domains::auth::challenge::ChallengeIssuer;
use crate::domains::auth::coordinator::VerificationCoordinator;
use crate::domains::auth::redirect::RedirectBuilder;
use crate::kernel::{
    BackendExchangeClient, BaseBackendExchange, BaseIdentityProvider, BaseSessionStore,
    ChallengeWidgetFactory, ConfiguredChallengeFactory, FileSessionStore, HandleStore,
    IdentityToolkitProvider,
};

// =============================================================================
// FlowDeps
// =============================================================================

/// Infrastructure the verification flow depends on (using traits for testability)
#[derive(Clone)]
pub struct FlowDeps {
    pub provider: Arc<dyn BaseIdentityProvider>,
    pub widgets: Arc<dyn ChallengeWidgetFactory>,
    pub backend: Arc<dyn BaseBackendExchange>,
    pub storage: Arc<dyn BaseSessionStore>,
    pub redirects: RedirectBuilder,
}

impl FlowDeps {
    pub fn new(
        provider: Arc<dyn BaseIdentityProvider>,
        widgets: Arc<dyn ChallengeWidgetFactory>,
        backend: Arc<dyn BaseBackendExchange>,
        storage: Arc<dyn BaseSessionStore>,
        redirects: RedirectBuilder,
    ) -> Self {
        Self {
            provider,
            widgets,
            backend,
            storage,
            redirects,
        }
    }

    /// Build the production dependencies from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let toolkit = IdentityToolkitService::new(
            IdentityToolkitOptions::new(config.identity_api_key.clone())
                .with_base_url(config.identity_base_url.clone()),
        );

        let backend = BackendExchangeClient::new(
            config.api_base_url.clone(),
            config.api_timeout,
            config.backend_email_field,
        )
        .context("Failed to create backend client")?;

        Ok(Self::new(
            Arc::new(IdentityToolkitProvider::new(toolkit)),
            Arc::new(ConfiguredChallengeFactory::new(config.recaptcha_token.clone())),
            Arc::new(backend),
            Arc::new(FileSessionStore::new(config.session_store_path.clone())),
            RedirectBuilder::new(config.app_link_base.clone(), config.app_reauth_path.clone()),
        ))
    }

    /// Assemble a coordinator over these dependencies
    pub fn into_coordinator(self, config: &Config) -> Arc<VerificationCoordinator> {
        Arc::new(VerificationCoordinator::new(
            ChallengeIssuer::new(self.provider, self.widgets),
            self.backend,
            self.redirects,
            HandleStore::new(self.storage),
            config.flow_options(),
        ))
    }
}
