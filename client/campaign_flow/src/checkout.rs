//! # Checkout
//!
//! [`CommitOrchestrator`] drives one user from "payment method selected" to
//! "campaign created".
//!
//! ```text
//! Unauthenticated ◄── identity lost (any state)
//!        │ identity present
//!        ▼
//! MethodUnselected ──► MethodSelected ──► Processing ──► Committed
//!                           ▲                  │
//!                           └──── Failed ◄─────┘
//! ```
//!
//! The staged draft in session storage is the only recovery record. It is
//! read on every attempt and deleted only after the remote creation call has
//! succeeded, so a failed attempt can be retried with the same data.
//!
//! `is_processing` is the sole concurrency guard: a second `commit` issued
//! while one is in flight is refused.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::draft::StagedDraft;
use crate::errors::{CheckoutError, PaymentError};
use crate::payment::PaymentCollaborator;
use crate::remote::CampaignApi;
use crate::storage::SessionStorage;
use crate::types::{AuthSession, Campaign, Notice, NoticeLevel, PaymentMethod, Route};

const REFERRAL_STEPS: [&str; 4] = [
    "Refer 5 friends to get your campaign approved",
    "Share your referral links with friends and family",
    "Once 5 referrals are accepted, your campaign will go to admin for approval",
    "Your campaign will become active after admin approval",
];

/// External services the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn SessionStorage>,
    pub api: Arc<dyn CampaignApi>,
    pub payment: Arc<dyn PaymentCollaborator>,
}

/// Observable position in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "method", rename_all = "snake_case")]
pub enum CheckoutState {
    Unauthenticated,
    MethodUnselected,
    MethodSelected(PaymentMethod),
    Processing(PaymentMethod),
    Committed,
}

/// In-memory attempt bookkeeping; dropped with the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct PaymentAttemptState {
    pub selected_method: Option<PaymentMethod>,
    pub is_processing: bool,
    committed: bool,
}

impl PaymentAttemptState {
    pub fn can_commit(&self) -> bool {
        self.selected_method.is_some() && !self.is_processing && !self.committed
    }
}

/// Successful end of the workflow.
#[derive(Debug, Clone)]
pub struct Committed {
    pub campaign: Campaign,
    pub notice: Notice,
    pub next: Route,
}

pub struct CommitOrchestrator {
    collaborators: Collaborators,
    identity: Mutex<Option<AuthSession>>,
    attempt: Mutex<PaymentAttemptState>,
    payment_timeout: Option<Duration>,
}

impl CommitOrchestrator {
    /// Open the checkout. Without an identity the caller is sent to sign in
    /// and no checkout exists.
    pub fn enter(identity: Option<AuthSession>, collaborators: Collaborators) -> Result<Self, Route> {
        let Some(identity) = identity else {
            info!("Checkout opened without a signed-in user; redirecting");
            return Err(Route::SignIn);
        };
        Ok(Self {
            collaborators,
            identity: Mutex::new(Some(identity)),
            attempt: Mutex::new(PaymentAttemptState::default()),
            payment_timeout: None,
        })
    }

    /// Fail the payment step if the collaborator has not answered in time.
    pub fn with_payment_timeout(mut self, limit: Duration) -> Self {
        self.payment_timeout = Some(limit);
        self
    }

    /// Re-check the identity whenever it may have changed. Returns the route
    /// to navigate to when the user is no longer signed in.
    ///
    /// A different user than the one holding the checkout counts as a loss:
    /// the staged draft must not be committed under someone else's token.
    pub fn observe_identity(&self, identity: Option<AuthSession>) -> Option<Route> {
        let mut current = lock(&self.identity);
        let switched = matches!(
            (current.as_ref(), identity.as_ref()),
            (Some(held), Some(seen)) if held.user_id != seen.user_id
        );
        if switched {
            warn!("Different user seen during checkout; redirecting");
            *current = None;
            return Some(Route::SignIn);
        }

        let signed_out = identity.is_none();
        *current = identity;
        if signed_out {
            warn!("Signed-in user lost during checkout; redirecting");
            Some(Route::SignIn)
        } else {
            None
        }
    }

    pub fn state(&self) -> CheckoutState {
        if lock(&self.identity).is_none() {
            return CheckoutState::Unauthenticated;
        }
        let attempt = lock(&self.attempt);
        match (attempt.committed, attempt.is_processing, attempt.selected_method) {
            (true, _, _) => CheckoutState::Committed,
            (false, true, Some(method)) => CheckoutState::Processing(method),
            (false, _, Some(method)) => CheckoutState::MethodSelected(method),
            (false, _, None) => CheckoutState::MethodUnselected,
        }
    }

    pub fn attempt(&self) -> PaymentAttemptState {
        lock(&self.attempt).clone()
    }

    /// Choose (or change) the payment method. No side effects.
    pub fn select_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        if lock(&self.identity).is_none() {
            return Err(CheckoutError::Unauthenticated);
        }
        let mut attempt = lock(&self.attempt);
        if attempt.committed {
            return Err(CheckoutError::AlreadyCommitted);
        }
        if attempt.is_processing {
            return Err(CheckoutError::AlreadyProcessing);
        }
        attempt.selected_method = Some(method);
        Ok(())
    }

    /// Pay, then promote the staged draft into a campaign.
    ///
    /// Guard failures return before anything is awaited. Every other failure
    /// leaves the staged draft in place and returns the flow to
    /// `MethodSelected`.
    pub async fn commit(&self) -> Result<Committed, CheckoutError> {
        let session = lock(&self.identity)
            .clone()
            .ok_or(CheckoutError::Unauthenticated)?;
        let (method, _processing) = self.begin_attempt()?;

        info!(
            "Processing {} checkout for user {}",
            method.as_str(),
            session.user_id
        );

        match self.run_attempt(method, &session.token).await {
            Ok(campaign) => {
                lock(&self.attempt).committed = true;
                info!("Campaign \"{}\" created; checkout complete", campaign.title);
                Ok(Committed {
                    notice: success_notice(&campaign),
                    campaign,
                    next: Route::Referrals,
                })
            }
            Err(err) => {
                error!("Checkout failed, staged draft kept for retry: {err}");
                Err(err)
            }
        }
    }

    fn begin_attempt(&self) -> Result<(PaymentMethod, ProcessingGuard<'_>), CheckoutError> {
        let mut attempt = lock(&self.attempt);
        if attempt.committed {
            return Err(CheckoutError::AlreadyCommitted);
        }
        if attempt.is_processing {
            return Err(CheckoutError::AlreadyProcessing);
        }
        let method = attempt
            .selected_method
            .ok_or(CheckoutError::NoMethodSelected)?;
        attempt.is_processing = true;
        Ok((method, ProcessingGuard { attempt: &self.attempt }))
    }

    async fn run_attempt(&self, method: PaymentMethod, token: &str) -> Result<Campaign, CheckoutError> {
        let confirmation = self.collaborators.payment.confirm(method);
        match self.payment_timeout {
            Some(limit) => tokio::time::timeout(limit, confirmation)
                .await
                .map_err(|_| PaymentError::TimedOut)??,
            None => confirmation.await?,
        }

        let storage = self.collaborators.storage.as_ref();
        let draft = StagedDraft::load(storage).await?;
        let campaign = self
            .collaborators
            .api
            .create_campaign(draft.into_payload(), token)
            .await?;

        // The campaign exists now; a leftover draft must not turn this into a failure.
        if let Err(e) = StagedDraft::discard(storage).await {
            warn!("Campaign created but staged draft could not be cleared: {e}");
        }
        Ok(campaign)
    }
}

/// Clears `is_processing` however the attempt ends, including when the
/// commit future is dropped mid-flight.
struct ProcessingGuard<'a> {
    attempt: &'a Mutex<PaymentAttemptState>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        lock(self.attempt).is_processing = false;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn success_notice(campaign: &Campaign) -> Notice {
    Notice {
        level: NoticeLevel::Success,
        title: "Payment Successful!".to_string(),
        text: format!(
            "Your campaign \"{}\" has been created and is now in draft status. \
             You can track your referral progress in the referrals section.",
            campaign.title
        ),
        steps: REFERRAL_STEPS.iter().map(|s| s.to_string()).collect(),
    }
}
