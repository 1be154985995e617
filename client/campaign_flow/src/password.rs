//! Password reset form submission.
//!
//! Both fields go through [`truncate_password`] before they are compared or
//! sent, so the value the server hashes is exactly the value the user
//! confirmed.

use tracing::{info, warn};

use crate::errors::ResetError;
use crate::remote::CampaignApi;
use crate::truncate::truncate_password;
use crate::types::Route;

pub const TRUNCATION_WARNING: &str =
    "Password exceeded 72-byte security limit and was truncated for compatibility.";
pub const RESET_SUCCESS: &str = "Password reset successfully. You can now sign in.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub message: &'static str,
    /// Set when either field had to be shortened.
    pub warning: Option<&'static str>,
    pub next: Route,
}

pub async fn submit_password_reset(
    api: &dyn CampaignApi,
    reset_token: &str,
    password: &str,
    confirm: &str,
) -> Result<ResetOutcome, ResetError> {
    let password = truncate_password(password);
    let confirm = truncate_password(confirm);
    if password.value != confirm.value {
        return Err(ResetError::Mismatch);
    }

    let warning = if password.was_truncated || confirm.was_truncated {
        warn!("New password exceeded the byte limit and was truncated");
        Some(TRUNCATION_WARNING)
    } else {
        None
    };

    api.reset_password(reset_token, &password.value).await?;
    info!("Password reset accepted");

    Ok(ResetOutcome {
        message: RESET_SUCCESS,
        warning,
        next: Route::SignIn,
    })
}
