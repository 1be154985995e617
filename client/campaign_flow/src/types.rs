//! # Types
//!
//! Shared data structures exchanged between the workflow, the remote
//! campaign API and the hosting surface.

use serde::{Deserialize, Serialize};

/// Payment options offered on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    PayPal,
    Square,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 2] = [PaymentMethod::PayPal, PaymentMethod::Square];

    /// Parse the identifier submitted by the checkout page.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "paypal" => Some(Self::PayPal),
            "square" => Some(Self::Square),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayPal => "paypal",
            Self::Square => "square",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PayPal => "PayPal",
            Self::Square => "Square",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::PayPal => "Pay securely using PayPal balance, bank account, or credit card.",
            Self::Square => "Use Square for fast, secure credit and debit card payments.",
        }
    }
}

/// Authenticated caller as recovered from the `auth` cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: u64,
}

// The bearer token must never reach the logs.
impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Campaign returned by the remote creation call. Only `title` is relied on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A donation record as listed for the donor dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub campaign_id: u64,
    pub amount: f64,
}

/// Client-side destinations the workflow can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    SignIn,
    Referrals,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::SignIn => "/signin",
            Self::Referrals => "/referrals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A single user-facing message produced at the end of a workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
    /// Follow-up steps shown as a list under the text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

impl Notice {
    pub fn warning(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: title.into(),
            text: text.into(),
            steps: Vec::new(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            text: text.into(),
            steps: Vec::new(),
        }
    }
}

/// Monthly listing fee charged for a campaign, in dollars.
pub const MONTHLY_FEE: u64 = 10;

/// Order summary shown above the payment options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub duration_months: String,
    pub monthly_fee: u64,
    pub total: String,
}

impl PaymentSummary {
    /// Build the summary from the checkout query string, defaulting to a
    /// single month at the base fee.
    pub fn from_query(amount: Option<&str>, duration: Option<&str>) -> Self {
        Self {
            duration_months: non_empty_or(duration, "1"),
            monthly_fee: MONTHLY_FEE,
            total: non_empty_or(amount, &MONTHLY_FEE.to_string()),
        }
    }

    /// `"1 month"` / `"3 months"`.
    pub fn duration_label(&self) -> String {
        let plural = if self.duration_months == "1" { "" } else { "s" };
        format!("{} month{plural}", self.duration_months)
    }

    pub fn pay_button_label(&self, method: Option<PaymentMethod>) -> String {
        let target = method
            .map(|m| m.as_str().to_uppercase())
            .unwrap_or_else(|| "selected method".to_string());
        format!("Pay ${} with {target}", self.total)
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}
