//! Kernel module - flow infrastructure and dependencies.

pub mod backend_client;
pub mod challenge_widget;
pub mod deps;
pub mod identity_provider;
pub mod session_store;
pub mod test_dependencies;
pub mod traits;

pub use backend_client::{BackendExchangeClient, DEFAULT_BACKEND_TIMEOUT};
pub use challenge_widget::{ConfiguredChallengeFactory, ConfiguredChallengeWidget};
pub use deps::FlowDeps;
pub use identity_provider::{map_toolkit_error, IdentityToolkitProvider};
pub use session_store::{FileSessionStore, HandleStore, MemorySessionStore, HANDLE_STORAGE_KEY};
pub use test_dependencies::TestDependencies;
pub use traits::*;
