// TestDependencies - mock implementations for testing
//
// Provides mock identity provider, challenge widgets and backend exchange
// that can be injected into a VerificationCoordinator for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::{
    BaseBackendExchange, BaseChallengeWidget, BaseIdentityProvider, BaseSessionStore,
    ChallengeWidgetFactory, HandleStore, MemorySessionStore,
};
use crate::config::FlowOptions;
use crate::domains::auth::challenge::ChallengeIssuer;
use crate::domains::auth::coordinator::VerificationCoordinator;
use crate::domains::auth::errors::{ProviderError, VerifyError};
use crate::domains::auth::models::OtpCode;
use crate::domains::auth::redirect::RedirectBuilder;
use crate::domains::auth::types::{
    AuthenticatedIdentity, ChallengeToken, SessionExchangeResult, VerificationHandle,
};

// =============================================================================
// Gate - holds async mock calls in flight until released
// =============================================================================

/// Blocks calls that pass through it until permits are added.
#[derive(Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `n` waiting (or future) calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

// =============================================================================
// Mock Identity Provider
// =============================================================================

pub struct MockIdentityProvider {
    valid_code: Mutex<String>,
    uid: Mutex<String>,
    send_errors: Arc<Mutex<VecDeque<ProviderError>>>,
    redeem_errors: Arc<Mutex<VecDeque<ProviderError>>>,
    live_handle: Arc<Mutex<Option<VerificationHandle>>>,
    sent_to: Arc<Mutex<Vec<String>>>,
    redeemed: Arc<Mutex<Vec<(String, String)>>>,
    sign_outs: Arc<Mutex<usize>>,
    issued: Arc<Mutex<usize>>,
    send_gate: Mutex<Option<Gate>>,
    redeem_gate: Mutex<Option<Gate>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            valid_code: Mutex::new("123456".to_string()),
            uid: Mutex::new("uid123".to_string()),
            send_errors: Arc::new(Mutex::new(VecDeque::new())),
            redeem_errors: Arc::new(Mutex::new(VecDeque::new())),
            live_handle: Arc::new(Mutex::new(None)),
            sent_to: Arc::new(Mutex::new(Vec::new())),
            redeemed: Arc::new(Mutex::new(Vec::new())),
            sign_outs: Arc::new(Mutex::new(0)),
            issued: Arc::new(Mutex::new(0)),
            send_gate: Mutex::new(None),
            redeem_gate: Mutex::new(None),
        }
    }

    /// The code that redeems successfully
    pub fn with_valid_code(self, code: &str) -> Self {
        *self.valid_code.lock().unwrap() = code.to_string();
        self
    }

    /// The uid returned on successful redemption
    pub fn with_uid(self, uid: &str) -> Self {
        *self.uid.lock().unwrap() = uid.to_string();
        self
    }

    /// Fail the next send with `error` (queued, one per call)
    pub fn with_send_error(self, error: ProviderError) -> Self {
        self.fail_next_send(error);
        self
    }

    /// Queue a send failure on an already shared provider
    pub fn fail_next_send(&self, error: ProviderError) {
        self.send_errors.lock().unwrap().push_back(error);
    }

    /// Fail the next redemption with `error` (queued, one per call)
    pub fn with_redeem_error(self, error: ProviderError) -> Self {
        self.redeem_errors.lock().unwrap().push_back(error);
        self
    }

    /// Hold sends until the gate is released
    pub fn with_send_gate(self, gate: Gate) -> Self {
        *self.send_gate.lock().unwrap() = Some(gate);
        self
    }

    /// Hold redemptions until the gate is released
    pub fn with_redeem_gate(self, gate: Gate) -> Self {
        *self.redeem_gate.lock().unwrap() = Some(gate);
        self
    }

    /// Phone numbers an SMS was sent to, in order
    pub fn sent_to(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }

    /// (handle, code) pairs that reached the provider
    pub fn redeemed(&self) -> Vec<(String, String)> {
        self.redeemed.lock().unwrap().clone()
    }

    pub fn sign_out_count(&self) -> usize {
        *self.sign_outs.lock().unwrap()
    }

    /// Pretend the provider issued `handle` (e.g. before a reload)
    pub fn issue_handle(&self, handle: &VerificationHandle) {
        *self.live_handle.lock().unwrap() = Some(handle.clone());
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseIdentityProvider for MockIdentityProvider {
    async fn send_otp(
        &self,
        phone_e164: &str,
        _challenge: &ChallengeToken,
    ) -> std::result::Result<VerificationHandle, ProviderError> {
        let gate = self.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(error) = self.send_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        self.sent_to.lock().unwrap().push(phone_e164.to_string());
        let handle = {
            let mut issued = self.issued.lock().unwrap();
            *issued += 1;
            VerificationHandle::new(format!("mock-handle-{}", *issued))
        };
        *self.live_handle.lock().unwrap() = Some(handle.clone());
        Ok(handle)
    }

    async fn redeem_otp(
        &self,
        handle: &VerificationHandle,
        code: &OtpCode,
    ) -> std::result::Result<AuthenticatedIdentity, ProviderError> {
        let gate = self.redeem_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        self.redeemed
            .lock()
            .unwrap()
            .push((handle.as_str().to_string(), code.as_str().to_string()));

        if let Some(error) = self.redeem_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        if self.live_handle.lock().unwrap().as_ref() != Some(handle) {
            return Err(ProviderError::CodeExpired);
        }
        if *self.valid_code.lock().unwrap() != code.as_str() {
            return Err(ProviderError::InvalidCode);
        }

        Ok(AuthenticatedIdentity {
            uid: self.uid.lock().unwrap().clone(),
            id_token: format!("id-token-for-{}", handle.as_str()),
            phone_number: None,
        })
    }

    async fn sign_out(&self) -> std::result::Result<(), ProviderError> {
        *self.sign_outs.lock().unwrap() += 1;
        Ok(())
    }
}

// =============================================================================
// Mock Challenge Widgets
// =============================================================================

pub struct MockChallengeWidget {
    failing_solves: Arc<Mutex<usize>>,
    solves: Arc<Mutex<usize>>,
    clears: Arc<Mutex<usize>>,
}

#[async_trait]
impl BaseChallengeWidget for MockChallengeWidget {
    async fn solve(&self) -> Result<ChallengeToken> {
        *self.solves.lock().unwrap() += 1;
        let mut failing = self.failing_solves.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(anyhow!("challenge expired"));
        }
        Ok(ChallengeToken::new("mock-challenge-token"))
    }

    fn clear(&self) {
        *self.clears.lock().unwrap() += 1;
    }
}

pub struct MockChallengeFactory {
    failing_solves: Arc<Mutex<usize>>,
    created: Arc<Mutex<usize>>,
    solves: Arc<Mutex<usize>>,
    clears: Arc<Mutex<usize>>,
}

impl MockChallengeFactory {
    pub fn new() -> Self {
        Self {
            failing_solves: Arc::new(Mutex::new(0)),
            created: Arc::new(Mutex::new(0)),
            solves: Arc::new(Mutex::new(0)),
            clears: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail the next `n` solves across all widgets
    pub fn with_failing_solves(self, n: usize) -> Self {
        *self.failing_solves.lock().unwrap() = n;
        self
    }

    pub fn created_count(&self) -> usize {
        *self.created.lock().unwrap()
    }

    pub fn solve_count(&self) -> usize {
        *self.solves.lock().unwrap()
    }

    pub fn cleared_count(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

impl Default for MockChallengeFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeWidgetFactory for MockChallengeFactory {
    fn create(&self) -> Result<Arc<dyn BaseChallengeWidget>> {
        *self.created.lock().unwrap() += 1;
        Ok(Arc::new(MockChallengeWidget {
            failing_solves: self.failing_solves.clone(),
            solves: self.solves.clone(),
            clears: self.clears.clone(),
        }))
    }
}

// =============================================================================
// Mock Backend Exchange
// =============================================================================

pub struct MockBackendExchange {
    responses: Arc<Mutex<VecDeque<std::result::Result<SessionExchangeResult, VerifyError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockBackendExchange {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful exchange returning `token`
    pub fn with_token(self, token: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(SessionExchangeResult {
                token: token.to_string(),
                is_done_sign_in: true,
            }));
        self
    }

    /// Queue a failed exchange
    pub fn with_error(self, error: VerifyError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Uids that were exchanged
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockBackendExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseBackendExchange for MockBackendExchange {
    async fn exchange(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> crate::domains::auth::errors::Result<SessionExchangeResult> {
        self.calls.lock().unwrap().push(identity.uid.clone());

        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(SessionExchangeResult {
                token: "abc".to_string(),
                is_done_sign_in: true,
            }),
        }
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub provider: Arc<MockIdentityProvider>,
    pub widgets: Arc<MockChallengeFactory>,
    pub backend: Arc<MockBackendExchange>,
    pub storage: Arc<MemorySessionStore>,
    pub options: FlowOptions,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(MockIdentityProvider::new()),
            widgets: Arc::new(MockChallengeFactory::new()),
            backend: Arc::new(MockBackendExchange::new()),
            storage: Arc::new(MemorySessionStore::new()),
            options: FlowOptions::default(),
        }
    }

    /// Set a mock identity provider
    pub fn mock_provider(mut self, provider: MockIdentityProvider) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Set a mock challenge widget factory
    pub fn mock_widgets(mut self, widgets: MockChallengeFactory) -> Self {
        self.widgets = Arc::new(widgets);
        self
    }

    /// Set a mock backend exchange
    pub fn mock_backend(mut self, backend: MockBackendExchange) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a coordinator. Coordinators built from clones of the same
    /// dependencies share storage, like two loads of the same page.
    pub fn into_coordinator(&self) -> Arc<VerificationCoordinator> {
        let storage: Arc<dyn BaseSessionStore> = self.storage.clone();
        Arc::new(VerificationCoordinator::new(
            ChallengeIssuer::new(self.provider.clone(), self.widgets.clone()),
            self.backend.clone(),
            RedirectBuilder::default(),
            HandleStore::new(storage),
            self.options.clone(),
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
