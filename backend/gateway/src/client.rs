//! HTTP client for the remote campaign API.
//!
//! | Operation          | Request                                         |
//! |--------------------|-------------------------------------------------|
//! | create campaign    | `POST {base}/campaigns/with-image` (multipart)  |
//! | payments for user  | `GET  {base}/payments/user/{id}`                |
//! | reset password     | `POST {base}/auth/reset-password` (JSON)        |
//!
//! Any non-2xx answer becomes [`RemoteError::Rejected`] carrying the response
//! body verbatim, so a `{"error": "..."}` document reaches the checkout's
//! classifier intact.

use async_trait::async_trait;
use campaign_flow::{Campaign, CampaignApi, CampaignPayload, Payment, RemoteError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

pub struct HttpCampaignApi {
    client: Client,
    base_url: String,
}

impl HttpCampaignApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl CampaignApi for HttpCampaignApi {
    async fn create_campaign(
        &self,
        payload: CampaignPayload,
        token: &str,
    ) -> Result<Campaign, RemoteError> {
        let form = build_form(payload)?;
        let response = self
            .client
            .post(self.url("/campaigns/with-image"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn payments_for_user(
        &self,
        user_id: u64,
        token: &str,
    ) -> Result<Vec<Payment>, RemoteError> {
        let response = self
            .client
            .get(self.url(&format!("/payments/user/{user_id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url("/auth/reset-password"))
            .json(&json!({
                "token": reset_token,
                "new_password": new_password,
            }))
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await.map(|_| ())
    }
}

fn build_form(payload: CampaignPayload) -> Result<Form, RemoteError> {
    let mut form = Form::new();
    for (name, value) in payload.fields {
        form = form.text(name, value);
    }
    if let Some(file) = payload.image_file {
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)
            .map_err(|e| RemoteError::Decode(format!("invalid image content type: {e}")))?;
        form = form.part("image_file", part);
    }
    Ok(form)
}

fn transport(err: reqwest::Error) -> RemoteError {
    warn!("Campaign API request failed: {err}");
    RemoteError::Transport(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("Campaign API answered {status}: {body}");
    Err(rejection(status, body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let response = ensure_success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

fn rejection(status: reqwest::StatusCode, body: String) -> RemoteError {
    if body.trim().is_empty() {
        RemoteError::Rejected(format!("Request failed with status {status}"))
    } else {
        RemoteError::Rejected(body)
    }
}
