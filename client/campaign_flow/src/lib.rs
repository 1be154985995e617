//! # Campaign Flow
//!
//! Client-side core of the campaign storefront: everything between "the
//! creator filled in the campaign form" and "the campaign exists on the
//! API", plus the credential handling the account pages share.
//!
//! | Concern              | Entry point(s)                                         |
//! |----------------------|--------------------------------------------------------|
//! | Draft staging        | [`StagedDraft::stage`], [`StagedDraft::load`], [`StagedDraft::discard`] |
//! | Checkout             | [`CommitOrchestrator::enter`], `select_method`, `commit` |
//! | Donor dashboard      | [`parse_auth_cookie`], [`load_donor_view`]             |
//! | Password reset       | [`submit_password_reset`]                              |
//! | Credential limits    | [`truncate`], [`truncate_password`]                    |
//!
//! ## Architecture
//!
//! Session storage, the remote API and payment capture are traits
//! ([`SessionStorage`], [`CampaignApi`], [`PaymentCollaborator`]) so the host
//! decides where drafts live and how requests travel. Nothing here owns a
//! runtime or a socket.

pub mod checkout;
pub mod dashboard;
pub mod draft;
pub mod errors;
pub mod password;
pub mod payment;
pub mod remote;
pub mod storage;
pub mod truncate;
pub mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_checkout;
#[cfg(test)]
mod test_support;

pub use checkout::{CheckoutState, Collaborators, CommitOrchestrator, Committed, PaymentAttemptState};
pub use dashboard::{load_donor_view, parse_auth_cookie, DonorView};
pub use draft::{CampaignForm, CampaignPayload, ImageSource, StagedDraft, StagedFile};
pub use errors::{CheckoutError, DraftError, PaymentError, RemoteError, ResetError, StorageError};
pub use password::{submit_password_reset, ResetOutcome};
pub use payment::{PaymentCollaborator, SimulatedPayment};
pub use remote::CampaignApi;
pub use storage::{MemoryStorage, SessionStorage};
pub use truncate::{truncate, truncate_password, Truncation, PASSWORD_MAX_BYTES};
pub use types::{
    AuthSession, Campaign, Notice, NoticeLevel, Payment, PaymentMethod, PaymentSummary, Route,
};
