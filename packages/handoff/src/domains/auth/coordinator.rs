//! Verification state machine.
//!
//! ```text
//! Idle ─send_code─▶ Sending ─▶ Sent(handle) ─verify─▶ Verifying ─▶ Verified
//!   ▲                  │            ▲  │                   │
//!   │                  ▼            │  └─resend─┐          ▼
//!   └──────────────  Failed ◀───────┴───────────┴──────── Failed
//! ```
//!
//! Methods take `&self`. State sits behind a mutex that is never held across
//! an `.await`: each operation checks and claims its state, releases the
//! lock for the network call, then re-checks an epoch before applying the
//! result. `abandon()` bumps the epoch, so late results are dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use super::challenge::ChallengeIssuer;
use super::cooldown::ResendCooldown;
use super::errors::{Result, VerifyError};
use super::models::{hash_phone_number, OtpCode, PhoneNumber, StoredHandle};
use super::redirect::RedirectBuilder;
use super::types::{AuthenticatedIdentity, RedirectTarget, VerificationHandle};
use crate::config::{FlowOptions, SignOutTiming};
use crate::kernel::{BaseBackendExchange, HandleStore};

/// Where the flow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    Sending,
    Sent {
        handle: VerificationHandle,
    },
    Verifying {
        handle: VerificationHandle,
    },
    /// Terminal. The redirect is `None` once it has been taken.
    Verified {
        identity: AuthenticatedIdentity,
        redirect: Option<RedirectTarget>,
    },
    /// Recoverable. A retained handle allows re-entering the code.
    Failed {
        reason: VerifyError,
        handle: Option<VerificationHandle>,
    },
}

impl VerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationState::Idle => "idle",
            VerificationState::Sending => "sending",
            VerificationState::Sent { .. } => "sent",
            VerificationState::Verifying { .. } => "verifying",
            VerificationState::Verified { .. } => "verified",
            VerificationState::Failed { .. } => "failed",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationState::Verified { .. })
    }
}

struct Inner {
    state: VerificationState,
    phone: Option<PhoneNumber>,
    cooldown: ResendCooldown,
    resend_in_flight: bool,
    epoch: u64,
}

pub struct VerificationCoordinator {
    issuer: ChallengeIssuer,
    backend: Arc<dyn BaseBackendExchange>,
    redirects: RedirectBuilder,
    handles: HandleStore,
    options: FlowOptions,
    inner: Mutex<Inner>,
}

impl VerificationCoordinator {
    pub fn new(
        issuer: ChallengeIssuer,
        backend: Arc<dyn BaseBackendExchange>,
        redirects: RedirectBuilder,
        handles: HandleStore,
        options: FlowOptions,
    ) -> Self {
        let cooldown = ResendCooldown::new(options.resend_cooldown);
        Self {
            issuer,
            backend,
            redirects,
            handles,
            options,
            inner: Mutex::new(Inner {
                state: VerificationState::Idle,
                phone: None,
                cooldown,
                resend_in_flight: false,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> VerificationState {
        self.lock().state.clone()
    }

    /// Phone number of the current attempt, if one was sent or restored.
    pub fn phone(&self) -> Option<PhoneNumber> {
        self.lock().phone.clone()
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    /// Whole seconds until `resend` is allowed.
    pub fn cooldown_remaining(&self) -> u64 {
        self.lock().cooldown.remaining_secs()
    }

    /// Pick up a handle persisted by an earlier run (page reload).
    ///
    /// Returns `true` if the coordinator moved to `Sent`.
    pub fn resume(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != VerificationState::Idle {
            return false;
        }
        let Some(stored) = self.handles.load() else {
            return false;
        };
        let Ok(phone) = PhoneNumber::parse(&stored.phone_number) else {
            warn!("Stored verification handle has an unusable phone number");
            self.handles.clear();
            return false;
        };

        info!(issued_at = %stored.issued_at, "Resuming verification from stored handle");
        self.issuer.adopt(stored.handle.clone());
        inner.phone = Some(phone);
        inner.state = VerificationState::Sent {
            handle: stored.handle,
        };
        true
    }

    /// Validate `input` and send the first code.
    pub async fn send_code(&self, input: &str) -> Result<()> {
        let (phone, epoch) = {
            let mut inner = self.lock();
            match &inner.state {
                VerificationState::Verified { .. } => return Ok(()),
                VerificationState::Idle | VerificationState::Failed { .. } => {}
                other => return Err(VerifyError::InvalidState(other.name())),
            }
            let phone = PhoneNumber::parse(input)?;
            inner.state = VerificationState::Sending;
            inner.phone = Some(phone.clone());
            (phone, inner.epoch)
        };

        let phone_e164 = self.options.e164(&phone);
        let result = self.issuer.dispatch(&phone_e164).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!("Discarding dispatch result after abandon");
            return Err(VerifyError::Abandoned);
        }

        match result {
            Ok(handle) => {
                if let Err(e) = self.handles.save(StoredHandle::new(handle.clone(), &phone)) {
                    // The in-memory handle still works for this run.
                    warn!("Failed to persist verification handle: {}", e);
                }
                inner.state = VerificationState::Sent { handle };
                Ok(())
            }
            Err(e) => {
                self.handles.clear();
                inner.state = VerificationState::Failed {
                    reason: e.clone(),
                    handle: None,
                };
                Err(e)
            }
        }
    }

    /// Send a fresh code, subject to the cooldown.
    pub async fn resend(&self, input: &str) -> Result<()> {
        let (phone, epoch) = {
            let mut inner = self.lock();
            match &inner.state {
                VerificationState::Verified { .. } => return Ok(()),
                VerificationState::Sent { .. } | VerificationState::Failed { .. } => {}
                VerificationState::Verifying { .. } => return Err(VerifyError::VerifyInFlight),
                other => return Err(VerifyError::InvalidState(other.name())),
            }
            if inner.cooldown.is_active() {
                let remaining = inner.cooldown.remaining_secs();
                debug!(remaining, "Resend rejected during cooldown");
                return Err(VerifyError::CooldownActive(remaining));
            }
            if inner.resend_in_flight {
                return Err(VerifyError::InvalidState("resending"));
            }
            let phone = PhoneNumber::parse(input)?;
            inner.cooldown.start();
            inner.resend_in_flight = true;
            (phone, inner.epoch)
        };

        let phone_e164 = self.options.e164(&phone);
        let result = self.issuer.reissue(&phone_e164).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!("Discarding resend result after abandon");
            return Err(VerifyError::Abandoned);
        }
        inner.resend_in_flight = false;

        match result {
            Ok(handle) => {
                if let Err(e) = self.handles.save(StoredHandle::new(handle.clone(), &phone)) {
                    warn!("Failed to persist verification handle: {}", e);
                }
                inner.phone = Some(phone);
                inner.cooldown.start();
                // A verify started with the old handle will fail on its own;
                // don't clobber its state.
                if !matches!(inner.state, VerificationState::Verifying { .. }) {
                    inner.state = VerificationState::Sent { handle };
                }
                Ok(())
            }
            Err(e) => {
                inner.cooldown.clear();
                Err(e)
            }
        }
    }

    /// Redeem `code` and exchange the identity for an app session.
    pub async fn verify(&self, code: OtpCode) -> Result<()> {
        let (handle, epoch) = {
            let mut inner = self.lock();
            let handle = match &inner.state {
                VerificationState::Verified { .. } => return Ok(()),
                VerificationState::Verifying { .. } => return Err(VerifyError::VerifyInFlight),
                VerificationState::Sending => return Err(VerifyError::InvalidState("sending")),
                VerificationState::Sent { handle } => Some(handle.clone()),
                VerificationState::Failed { handle, .. } => handle.clone(),
                VerificationState::Idle => None,
            };
            let handle = match handle {
                Some(handle) => handle,
                None => match self.handles.load() {
                    Some(stored) => {
                        self.issuer.adopt(stored.handle.clone());
                        stored.handle
                    }
                    None => {
                        warn!("Verify attempted without a verification handle");
                        return Err(VerifyError::MissingVerificationContext);
                    }
                },
            };
            inner.state = VerificationState::Verifying {
                handle: handle.clone(),
            };
            (handle, inner.epoch)
        };

        let identity = match self.issuer.redeem(&handle, &code).await {
            Ok(identity) => identity,
            Err(e) => {
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    return Err(VerifyError::Abandoned);
                }
                // A resend that landed during redemption owns the live and
                // stored handle now; keep it and leave both in place.
                let retained = match self.issuer.live() {
                    Some(live) if live != handle => {
                        debug!("Handle replaced by a resend during redemption");
                        Some(live)
                    }
                    // An expired code kills the handle; anything else may be retried.
                    _ if e == VerifyError::CodeExpired => {
                        self.issuer.retire();
                        self.handles.clear();
                        None
                    }
                    _ => Some(handle),
                };
                inner.state = VerificationState::Failed {
                    reason: e.clone(),
                    handle: retained,
                };
                return Err(e);
            }
        };

        if self.lock().epoch != epoch {
            self.sign_out_quietly().await;
            return Err(VerifyError::Abandoned);
        }

        // The credential is spent either way from here on.
        self.issuer.retire();
        self.handles.clear();

        let exchanged = self.backend.exchange(&identity).await;

        let session = match exchanged {
            Ok(session) => session,
            Err(e) => {
                error!(uid = %identity.uid, "Backend exchange failed after sign-in: {}", e);
                self.sign_out_quietly().await;
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    return Err(VerifyError::Abandoned);
                }
                inner.state = VerificationState::Failed {
                    reason: e.clone(),
                    handle: None,
                };
                return Err(e);
            }
        };

        let redirect = self.redirects.build(&identity, &session);

        if self.lock().epoch != epoch {
            self.sign_out_quietly().await;
            return Err(VerifyError::Abandoned);
        }

        if self.options.sign_out_timing == SignOutTiming::OnVerified {
            self.sign_out_quietly().await;
        }

        let mut inner = self.lock();
        if let Some(phone) = &inner.phone {
            let phone_hash = hash_phone_number(&self.options.e164(phone));
            info!(uid = %identity.uid, %phone_hash, "Phone number verified");
        }
        inner.cooldown.clear();
        inner.state = VerificationState::Verified {
            identity,
            redirect: Some(redirect),
        };
        Ok(())
    }

    /// Hand out the redirect once. Later calls return `None`.
    pub fn take_redirect(&self) -> Option<RedirectTarget> {
        match &mut self.lock().state {
            VerificationState::Verified { redirect, .. } => redirect.take(),
            _ => None,
        }
    }

    /// Take the redirect and, when configured, sign out before following it.
    ///
    /// A failed sign-out is logged; the redirect is returned regardless.
    pub async fn complete(&self) -> Option<RedirectTarget> {
        let redirect = self.take_redirect()?;
        if self.options.sign_out_timing == SignOutTiming::OnRedirect {
            self.sign_out_quietly().await;
        }
        Some(redirect)
    }

    /// The user left. In-flight results are discarded; the stored handle is
    /// kept so a reload can resume.
    pub fn abandon(&self) {
        let mut inner = self.lock();
        if inner.state.is_verified() {
            return;
        }
        inner.epoch += 1;
        inner.resend_in_flight = false;
        inner.cooldown.clear();
        inner.state = VerificationState::Idle;
        debug!(epoch = inner.epoch, "Verification abandoned");
    }

    async fn sign_out_quietly(&self) {
        if let Err(e) = self.issuer.sign_out().await {
            error!("Sign-out failed: {}", e);
        }
    }
}
