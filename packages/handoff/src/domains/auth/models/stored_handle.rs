use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::auth::models::PhoneNumber;
use crate::domains::auth::types::VerificationHandle;

/// Persisted form of the live verification handle.
///
/// Stored as JSON under [`HANDLE_STORAGE_KEY`](crate::kernel::HANDLE_STORAGE_KEY)
/// so a reloaded session can verify, and resend to the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHandle {
    pub handle: VerificationHandle,
    /// National digits, as entered
    pub phone_number: String,
    pub issued_at: DateTime<Utc>,
}

impl StoredHandle {
    pub fn new(handle: VerificationHandle, phone: &PhoneNumber) -> Self {
        Self {
            handle,
            phone_number: phone.digits().to_string(),
            issued_at: Utc::now(),
        }
    }
}
