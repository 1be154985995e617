//! Axum REST API handlers.
//!
//! Each browser tab identifies itself with a session id in the path; the
//! signed-in user comes from the `auth` cookie on every request. One
//! [`CommitOrchestrator`] is kept per session id and dropped once the
//! campaign is created, the user signs out, or the session sits idle past
//! the sweeper's TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use campaign_flow::{
    load_donor_view, parse_auth_cookie, submit_password_reset, AuthSession, Campaign, CampaignApi,
    CampaignForm, CheckoutError, CheckoutState, Collaborators, CommitOrchestrator, DonorView, DraftError,
    ImageSource, Notice, Payment, PaymentCollaborator, PaymentMethod, PaymentSummary, Route,
    StagedDraft, StagedFile,
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::db::SqliteSessionStorage;

const AUTH_COOKIE: &str = "auth";

/// A session's checkout and when a request last reached it.
struct OpenCheckout {
    checkout: Arc<CommitOrchestrator>,
    touched: Instant,
}

pub struct ApiState {
    pub pool: SqlitePool,
    pub api: Arc<dyn CampaignApi>,
    pub payment: Arc<dyn PaymentCollaborator>,
    pub payment_timeout: Duration,
    checkouts: Mutex<HashMap<String, OpenCheckout>>,
}

impl ApiState {
    pub fn new(
        pool: SqlitePool,
        api: Arc<dyn CampaignApi>,
        payment: Arc<dyn PaymentCollaborator>,
        payment_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            api,
            payment,
            payment_timeout,
            checkouts: Mutex::new(HashMap::new()),
        }
    }

    fn checkouts(&self) -> MutexGuard<'_, HashMap<String, OpenCheckout>> {
        self.checkouts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Find or open the checkout for `session_id`, re-checking the identity.
    fn checkout_for(
        &self,
        session_id: &str,
        identity: Option<AuthSession>,
    ) -> Result<Arc<CommitOrchestrator>, Route> {
        let mut checkouts = self.checkouts();
        if let Some(open) = checkouts.get_mut(session_id) {
            if let Some(route) = open.checkout.observe_identity(identity) {
                checkouts.remove(session_id);
                return Err(route);
            }
            open.touched = Instant::now();
            return Ok(open.checkout.clone());
        }

        let collaborators = Collaborators {
            storage: Arc::new(SqliteSessionStorage::scoped(self.pool.clone(), session_id)),
            api: self.api.clone(),
            payment: self.payment.clone(),
        };
        let checkout = Arc::new(
            CommitOrchestrator::enter(identity, collaborators)?
                .with_payment_timeout(self.payment_timeout),
        );
        checkouts.insert(
            session_id.to_string(),
            OpenCheckout {
                checkout: checkout.clone(),
                touched: Instant::now(),
            },
        );
        Ok(checkout)
    }

    /// Drop the registry entry for `session_id` if it is still `checkout`.
    /// A newer checkout opened for the same session is left alone.
    fn release(&self, session_id: &str, checkout: &Arc<CommitOrchestrator>) {
        let mut checkouts = self.checkouts();
        if checkouts
            .get(session_id)
            .is_some_and(|open| Arc::ptr_eq(&open.checkout, checkout))
        {
            checkouts.remove(session_id);
        }
    }

    /// Forget checkouts no request has reached for `idle`. Checkouts with a
    /// payment in flight are kept. Returns the number removed.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let mut checkouts = self.checkouts();
        let before = checkouts.len();
        checkouts.retain(|session_id, open| {
            let keep = open.touched.elapsed() < idle || open.checkout.attempt().is_processing;
            if !keep {
                debug!("Evicting idle checkout for session {session_id}");
            }
            keep
        });
        before - checkouts.len()
    }

    pub fn open_checkouts(&self) -> usize {
        self.checkouts().len()
    }
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct RedirectResponse {
    pub redirect: &'static str,
}

#[derive(Serialize)]
pub struct DonorPaymentsResponse {
    pub authenticated: bool,
    pub message: Option<&'static str>,
    pub payments: Vec<Payment>,
}

#[derive(Deserialize)]
pub struct FileUpload {
    pub name: String,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
}

#[derive(Deserialize)]
pub struct StageDraftRequest {
    pub form: CampaignForm,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub file: Option<FileUpload>,
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub amount: Option<String>,
    pub duration: Option<String>,
}

#[derive(Serialize)]
pub struct MethodOption {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub state: CheckoutState,
    pub summary: PaymentSummary,
    pub duration_label: String,
    pub pay_label: String,
    pub methods: Vec<MethodOption>,
}

#[derive(Deserialize)]
pub struct SelectMethodRequest {
    pub method: String,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub campaign: Campaign,
    pub notice: Notice,
    pub redirect: &'static str,
}

#[derive(Serialize)]
pub struct CommitFailure {
    pub notice: Notice,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm: String,
}

#[derive(Serialize)]
pub struct ResetPasswordResponse {
    pub message: &'static str,
    pub warning: Option<&'static str>,
    pub redirect: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /donor/payments`
///
/// Payments of the signed-in donor. A missing or malformed cookie yields the
/// signed-out view, never an error.
pub async fn donor_payments(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> impl IntoResponse {
    let cookie = auth_cookie(&headers);
    let view = load_donor_view(cookie.as_deref(), state.api.as_ref()).await;
    let authenticated = view.is_authenticated();
    let message = view.message();
    let payments = match view {
        DonorView::Payments(payments) => payments,
        _ => Vec::new(),
    };
    Json(DonorPaymentsResponse {
        authenticated,
        message,
        payments,
    })
}

/// `PUT /sessions/:id/draft`
///
/// Stage the campaign form ahead of payment, replacing any earlier draft.
pub async fn stage_draft(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<StageDraftRequest>,
) -> Response {
    if identity(&headers).is_none() {
        return redirect(Route::SignIn);
    }

    let image = match (request.file, request.image_url.filter(|u| !u.is_empty())) {
        (Some(_), Some(_)) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Provide either an image file or an image URL, not both",
            )
        }
        (Some(file), None) => match StagedFile::from_data_url(&file.name, &file.data_url) {
            Ok(file) => Some(ImageSource::File(file)),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        (None, Some(url)) => Some(ImageSource::Url(url)),
        (None, None) => None,
    };

    let storage = SqliteSessionStorage::scoped(state.pool.clone(), session_id.as_str());
    match StagedDraft::new(request.form, image).stage(&storage).await {
        Ok(()) => {
            info!("Draft staged for session {session_id}");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ (DraftError::Invalid(_) | DraftError::InvalidFileData(_))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Failed to stage draft for session {session_id}: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `GET /sessions/:id/checkout?amount=&duration=`
pub async fn get_checkout(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SummaryQuery>,
    headers: HeaderMap,
) -> Response {
    let checkout = match state.checkout_for(&session_id, identity(&headers)) {
        Ok(checkout) => checkout,
        Err(route) => return redirect(route),
    };

    let current = checkout.state();
    let selected = match current {
        CheckoutState::MethodSelected(m) | CheckoutState::Processing(m) => Some(m),
        _ => None,
    };
    let summary = PaymentSummary::from_query(query.amount.as_deref(), query.duration.as_deref());
    Json(CheckoutResponse {
        state: current,
        duration_label: summary.duration_label(),
        pay_label: summary.pay_button_label(selected),
        summary,
        methods: PaymentMethod::ALL
            .iter()
            .map(|m| MethodOption {
                id: m.as_str(),
                label: m.label(),
                description: m.description(),
            })
            .collect(),
    })
    .into_response()
}

/// `POST /sessions/:id/checkout/method`
pub async fn select_method(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SelectMethodRequest>,
) -> Response {
    let checkout = match state.checkout_for(&session_id, identity(&headers)) {
        Ok(checkout) => checkout,
        Err(route) => return redirect(route),
    };
    let Some(method) = PaymentMethod::from_id(&request.method) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown payment method: {}", request.method),
        );
    };

    match checkout.select_method(method) {
        Ok(()) => Json(checkout.state()).into_response(),
        Err(e) => checkout_failure(e),
    }
}

/// `POST /sessions/:id/checkout/commit`
///
/// Pay and create the campaign from the staged draft.
pub async fn commit_checkout(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let checkout = match state.checkout_for(&session_id, identity(&headers)) {
        Ok(checkout) => checkout,
        Err(route) => return redirect(route),
    };

    match checkout.commit().await {
        Ok(committed) => {
            state.release(&session_id, &checkout);
            Json(CommitResponse {
                campaign: committed.campaign,
                notice: committed.notice,
                redirect: committed.next.path(),
            })
            .into_response()
        }
        Err(e) => checkout_failure(e),
    }
}

/// `POST /auth/reset-password`
pub async fn reset_password(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Response {
    match submit_password_reset(
        state.api.as_ref(),
        &request.token,
        &request.password,
        &request.confirm,
    )
    .await
    {
        Ok(outcome) => Json(ResetPasswordResponse {
            message: outcome.message,
            warning: outcome.warning,
            redirect: outcome.next.path(),
        })
        .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.user_message()),
    }
}

// ─────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────

fn identity(headers: &HeaderMap) -> Option<AuthSession> {
    parse_auth_cookie(auth_cookie(headers).as_deref())
}

/// Raw value of the `auth` cookie, percent-decoded when needed.
fn auth_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .and_then(|(_, value)| percent_decode(value))
}

fn percent_decode(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn status_for(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CheckoutError::NoMethodSelected => StatusCode::BAD_REQUEST,
        CheckoutError::AlreadyProcessing | CheckoutError::AlreadyCommitted => StatusCode::CONFLICT,
        CheckoutError::DraftMissing => StatusCode::NOT_FOUND,
        CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::Rejected(_) | CheckoutError::Transient(_) => StatusCode::BAD_GATEWAY,
    }
}

fn checkout_failure(err: CheckoutError) -> Response {
    if err.requires_sign_in() {
        return redirect(Route::SignIn);
    }
    (status_for(&err), Json(CommitFailure { notice: err.notice() })).into_response()
}

fn redirect(route: Route) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(RedirectResponse {
            redirect: route.path(),
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}
