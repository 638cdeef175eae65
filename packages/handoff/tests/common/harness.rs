//! Test harness for verification flow integration tests.
//!
//! Every test gets fresh mocks. Coordinators built from one harness share
//! the same session storage and identity provider, so `reload()` behaves
//! like reopening the page mid-verification.

use handoff_core::config::FlowOptions;
use handoff_core::domains::auth::{VerificationCoordinator, VerificationState};
use handoff_core::kernel::test_dependencies::{
    MockBackendExchange, MockChallengeFactory, MockIdentityProvider, TestDependencies,
};
use std::sync::Arc;
use test_context::AsyncTestContext;

/// Test harness that owns the mocks and the coordinator under test.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     ctx.coordinator.send_code("09012345678").await.unwrap();
/// }
/// ```
pub struct TestHarness {
    pub deps: TestDependencies,
    pub coordinator: Arc<VerificationCoordinator>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new(TestDependencies::new())
    }

    async fn teardown(self) {
        // Mocks are dropped with the harness
    }
}

impl TestHarness {
    pub fn new(deps: TestDependencies) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let coordinator = deps.into_coordinator();
        Self { deps, coordinator }
    }

    /// Swap in a configured provider and rebuild the coordinator.
    pub fn with_provider(&mut self, provider: MockIdentityProvider) {
        self.deps = self.deps.clone().mock_provider(provider);
        self.coordinator = self.deps.into_coordinator();
    }

    /// Swap in a configured backend and rebuild the coordinator.
    pub fn with_backend(&mut self, backend: MockBackendExchange) {
        self.deps = self.deps.clone().mock_backend(backend);
        self.coordinator = self.deps.into_coordinator();
    }

    /// Swap in a configured widget factory and rebuild the coordinator.
    pub fn with_widgets(&mut self, widgets: MockChallengeFactory) {
        self.deps = self.deps.clone().mock_widgets(widgets);
        self.coordinator = self.deps.into_coordinator();
    }

    /// Replace flow options and rebuild the coordinator.
    pub fn with_options(&mut self, options: FlowOptions) {
        self.deps = self.deps.clone().options(options);
        self.coordinator = self.deps.into_coordinator();
    }

    /// A fresh coordinator over the same storage and provider.
    pub fn reload(&self) -> Arc<VerificationCoordinator> {
        self.deps.into_coordinator()
    }

    pub fn provider(&self) -> &MockIdentityProvider {
        &self.deps.provider
    }

    pub fn backend(&self) -> &MockBackendExchange {
        &self.deps.backend
    }

    pub fn widgets(&self) -> &MockChallengeFactory {
        &self.deps.widgets
    }

    /// Yield until the coordinator reaches `Verifying` (a gated redeem is
    /// in flight).
    pub async fn until_verifying(&self) {
        while !matches!(
            self.coordinator.state(),
            VerificationState::Verifying { .. }
        ) {
            tokio::task::yield_now().await;
        }
    }
}
