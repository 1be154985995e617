//! Donor dashboard gate.
//!
//! The `auth` cookie is user-controlled. It is parsed as
//! `{"token": "...", "user": {"id": N}}` and anything else, whether
//! malformed JSON, an empty token or a missing/zero id, is treated as
//! signed out. Parse failures are logged, never surfaced.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::remote::CampaignApi;
use crate::types::{AuthSession, Payment};

#[derive(Deserialize)]
struct AuthCookie {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<CookieUser>,
}

#[derive(Deserialize)]
struct CookieUser {
    #[serde(default)]
    id: Option<u64>,
}

/// Recover the signed-in user from the raw `auth` cookie value, if any.
pub fn parse_auth_cookie(raw: Option<&str>) -> Option<AuthSession> {
    let raw = raw.filter(|v| !v.is_empty())?;

    let cookie: AuthCookie = match serde_json::from_str(raw) {
        Ok(cookie) => cookie,
        Err(e) => {
            warn!("Failed to read auth cookie: {e}");
            return None;
        }
    };

    let token = cookie.token.filter(|t| !t.is_empty());
    let user_id = cookie.user.and_then(|u| u.id).filter(|id| *id != 0);
    match (token, user_id) {
        (Some(token), Some(user_id)) => Some(AuthSession { token, user_id }),
        _ => {
            warn!("Auth cookie is missing a token or user id");
            None
        }
    }
}

/// What the donor dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "payments", rename_all = "snake_case")]
pub enum DonorView {
    SignedOut,
    Empty,
    Payments(Vec<Payment>),
}

impl DonorView {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, DonorView::SignedOut)
    }

    /// Placeholder text for the non-list views.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            DonorView::SignedOut => Some("Sign in to view your donations."),
            DonorView::Empty => Some("You haven't made any donations yet."),
            DonorView::Payments(_) => None,
        }
    }
}

/// Build the dashboard for whoever the cookie names. No network call is
/// made unless the cookie is structurally valid.
pub async fn load_donor_view(cookie: Option<&str>, api: &dyn CampaignApi) -> DonorView {
    let Some(session) = parse_auth_cookie(cookie) else {
        return DonorView::SignedOut;
    };

    match api.payments_for_user(session.user_id, &session.token).await {
        Ok(payments) if payments.is_empty() => DonorView::Empty,
        Ok(payments) => {
            info!(
                "Loaded {} payments for user {}",
                payments.len(),
                session.user_id
            );
            DonorView::Payments(payments)
        }
        Err(e) => {
            warn!("Failed to load payments for user {}: {e}", session.user_id);
            DonorView::Empty
        }
    }
}
