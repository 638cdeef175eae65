use std::time::Duration;

use tokio::time::Instant;

/// Countdown gating resend requests.
///
/// Counts down in whole seconds from the moment it is started. Backed by
/// `tokio::time::Instant`, so paused test clocks drive it.
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    window: Duration,
    deadline: Option<Instant>,
}

impl ResendCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Start (or restart) the countdown from now.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Drop straight to zero.
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn remaining(&self) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Remaining time in whole seconds, rounded up: `60, 59, ..., 1, 0`.
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        let secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    pub fn is_active(&self) -> bool {
        !self.remaining().is_zero()
    }
}
