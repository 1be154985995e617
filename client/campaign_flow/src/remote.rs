//! Contract of the remote campaign API.
//!
//! The hosting surface supplies the transport; the workflow only sees this
//! trait.

use async_trait::async_trait;

use crate::draft::CampaignPayload;
use crate::errors::RemoteError;
use crate::types::{Campaign, Payment};

#[async_trait]
pub trait CampaignApi: Send + Sync {
    /// Create a campaign from a multi-part payload on behalf of the bearer.
    async fn create_campaign(
        &self,
        payload: CampaignPayload,
        token: &str,
    ) -> Result<Campaign, RemoteError>;

    /// Payments made by `user_id`, in the order the API returns them.
    async fn payments_for_user(&self, user_id: u64, token: &str)
        -> Result<Vec<Payment>, RemoteError>;

    /// Complete a password reset started by e-mail.
    async fn reset_password(&self, reset_token: &str, new_password: &str)
        -> Result<(), RemoteError>;
}
