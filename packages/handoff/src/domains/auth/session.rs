//! Code-entry screen logic: an [`OtpEntryController`] in front of the
//! coordinator.
//!
//! A completed buffer is verified once, after a short debounce. A failed
//! verify resets the buffer and shows the error's user message.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::coordinator::VerificationCoordinator;
use super::errors::{Result, VerifyError};
use super::models::{OtpCode, OTP_LENGTH};
use super::otp_entry::{EntryEvent, OtpEntryController};

pub struct VerificationSession {
    coordinator: Arc<VerificationCoordinator>,
    entry: Mutex<OtpEntryController>,
}

impl VerificationSession {
    pub fn new(coordinator: Arc<VerificationCoordinator>) -> Self {
        Self {
            coordinator,
            entry: Mutex::new(OtpEntryController::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<VerificationCoordinator> {
        &self.coordinator
    }

    fn entry(&self) -> MutexGuard<'_, OtpEntryController> {
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Type into cell `index`. Returns the verify outcome if this input
    /// completed the code.
    pub async fn input_digit(&self, index: usize, input: &str) -> Option<Result<()>> {
        let event = self.entry().set_digit(index, input);
        self.after(event).await
    }

    pub fn backspace(&self, index: usize) {
        self.entry().backspace(index);
    }

    /// Paste a whole code. Returns the verify outcome if the paste completed it.
    pub async fn paste(&self, text: &str) -> Option<Result<()>> {
        let event = self.entry().paste_bulk(text);
        self.after(event).await
    }

    async fn after(&self, event: EntryEvent) -> Option<Result<()>> {
        match event {
            EntryEvent::Completed(code) => Some(self.submit(code).await),
            EntryEvent::Rejected | EntryEvent::Updated => None,
        }
    }

    async fn submit(&self, code: OtpCode) -> Result<()> {
        let debounce = self.coordinator.options().completion_debounce;
        debug!(?debounce, "Code complete, verifying after debounce");
        tokio::time::sleep(debounce).await;

        let result = self.coordinator.verify(code).await;
        match &result {
            Ok(()) | Err(VerifyError::Abandoned) => {}
            Err(e) => {
                let mut entry = self.entry();
                entry.reset();
                entry.set_error(e.user_message());
            }
        }
        result
    }

    /// Discard a partial entry.
    pub fn clear(&self) {
        self.entry().reset();
    }

    pub fn cells(&self) -> [String; OTP_LENGTH] {
        self.entry().cells()
    }

    pub fn focus(&self) -> usize {
        self.entry().focus()
    }

    pub fn error(&self) -> Option<String> {
        self.entry().error().map(str::to_string)
    }
}
