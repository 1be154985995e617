//! Error types for every layer of the checkout workflow.
//!
//! Collaborator errors ([`StorageError`], [`RemoteError`], [`PaymentError`])
//! and [`DraftError`] are folded into a single [`CheckoutError`] at the
//! orchestrator boundary, which in turn renders to one user-facing
//! [`Notice`].

use serde_json::Value;
use thiserror::Error;

use crate::types::Notice;

const GENERIC_RETRY: &str =
    "There was an error processing your payment or creating your campaign. Please try again.";
const VALIDATION_GUIDANCE: &str =
    "Please check your campaign details and make sure all fields meet the requirements.";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session storage backend error: {0}")]
    Backend(String),
}

/// Failures reported by the remote campaign API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with an error. The message may itself be a
    /// serialized `{"error": "..."}` document.
    #[error("{0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment confirmation timed out")]
    TimedOut,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Campaign form data not found")]
    Missing,

    #[error("Campaign form data is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Staged campaign image could not be decoded: {0}")]
    InvalidFileData(String),

    #[error("Invalid campaign draft: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Every way a commit attempt can end without a persisted campaign.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("No payment method selected")]
    NoMethodSelected,

    #[error("A payment is already being processed")]
    AlreadyProcessing,

    #[error("The campaign has already been created")]
    AlreadyCommitted,

    #[error("Campaign form data not found")]
    DraftMissing,

    #[error("Campaign rejected by validation: {0}")]
    Validation(String),

    #[error("Campaign rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    Transient(String),
}

impl From<RemoteError> for CheckoutError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected(message) => classify_rejection(&message),
            other => CheckoutError::Transient(other.to_string()),
        }
    }
}

impl From<DraftError> for CheckoutError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Missing => CheckoutError::DraftMissing,
            other => CheckoutError::Transient(other.to_string()),
        }
    }
}

impl From<StorageError> for CheckoutError {
    fn from(err: StorageError) -> Self {
        CheckoutError::Transient(err.to_string())
    }
}

/// Sort a rejection message into validation / server-explained / unknown.
///
/// Only a JSON object with a string `error` member counts as explained.
pub fn classify_rejection(message: &str) -> CheckoutError {
    let explained = serde_json::from_str::<Value>(message)
        .ok()
        .and_then(|body| match body {
            Value::Object(mut fields) => match fields.remove("error") {
                Some(Value::String(error)) => Some(error),
                _ => None,
            },
            _ => None,
        });
    match explained {
        Some(error) if error.contains("validation error") => CheckoutError::Validation(error),
        Some(error) => CheckoutError::Rejected(error),
        None => CheckoutError::Transient(message.to_string()),
    }
}

impl CheckoutError {
    /// Whether the user should be sent to sign in instead of shown a notice.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, CheckoutError::Unauthenticated)
    }

    /// The single message shown to the user for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            CheckoutError::Unauthenticated => {
                Notice::warning("Sign in required", "Please sign in to complete your payment.")
            }
            CheckoutError::NoMethodSelected => Notice::warning(
                "Select Payment Method",
                "Please select a payment method to continue.",
            ),
            CheckoutError::AlreadyProcessing => Notice::warning(
                "Processing",
                "Your payment is already being processed.",
            ),
            CheckoutError::AlreadyCommitted => Notice::warning(
                "Already Created",
                "Your campaign has already been created.",
            ),
            CheckoutError::DraftMissing => Notice::warning(
                "Campaign Not Found",
                "Campaign form data not found. Please fill in your campaign details again.",
            ),
            CheckoutError::Validation(_) => Notice::error(VALIDATION_GUIDANCE),
            CheckoutError::Rejected(message) => Notice::error(message.clone()),
            CheckoutError::Payment(_) | CheckoutError::Transient(_) => {
                Notice::error(GENERIC_RETRY)
            }
        }
    }
}

/// Failures of the password reset form.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("Passwords do not match")]
    Mismatch,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ResetError {
    pub fn user_message(&self) -> String {
        match self {
            ResetError::Mismatch => self.to_string(),
            ResetError::Remote(RemoteError::Rejected(message)) if !message.is_empty() => {
                message.clone()
            }
            ResetError::Remote(_) => "Failed to reset password".to_string(),
        }
    }
}
