//! Scripted collaborators for workflow tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::checkout::{Collaborators, CommitOrchestrator};
use crate::draft::{CampaignForm, CampaignPayload, ImageSource, StagedDraft, StagedFile};
use crate::errors::{PaymentError, RemoteError};
use crate::payment::PaymentCollaborator;
use crate::remote::CampaignApi;
use crate::storage::MemoryStorage;
use crate::types::{AuthSession, Campaign, Payment, PaymentMethod};

/// Replays queued results; an empty queue means success.
#[derive(Default)]
pub struct FakeApi {
    pub create_results: Mutex<VecDeque<Result<Campaign, RemoteError>>>,
    pub payments: Mutex<Option<Result<Vec<Payment>, RemoteError>>>,
    pub reset_result: Mutex<Option<RemoteError>>,
    pub create_calls: Mutex<Vec<(CampaignPayload, String)>>,
    pub list_calls: AtomicUsize,
    pub reset_calls: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn failing_create(self, err: RemoteError) -> Self {
        self.create_results.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_payments(self, payments: Result<Vec<Payment>, RemoteError>) -> Self {
        *self.payments.lock().unwrap() = Some(payments);
        self
    }

    pub fn failing_reset(self, err: RemoteError) -> Self {
        *self.reset_result.lock().unwrap() = Some(err);
        self
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CampaignApi for FakeApi {
    async fn create_campaign(
        &self,
        payload: CampaignPayload,
        token: &str,
    ) -> Result<Campaign, RemoteError> {
        let title = payload.field("title").unwrap_or_default().to_string();
        self.create_calls
            .lock()
            .unwrap()
            .push((payload, token.to_string()));
        let scripted = self.create_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Campaign {
                id: Some(1),
                title,
                status: Some("draft".to_string()),
            })
        })
    }

    async fn payments_for_user(
        &self,
        _user_id: u64,
        _token: &str,
    ) -> Result<Vec<Payment>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.payments
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), RemoteError> {
        self.reset_calls
            .lock()
            .unwrap()
            .push((reset_token.to_string(), new_password.to_string()));
        match self.reset_result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub enum PaymentScript {
    Approve,
    Decline,
    Hang,
}

pub struct FakePayment {
    pub script: PaymentScript,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakePayment {
    pub fn new(script: PaymentScript) -> Self {
        Self {
            script,
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentCollaborator for FakePayment {
    async fn confirm(&self, _method: PaymentMethod) -> Result<(), PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            PaymentScript::Approve => {
                tokio::time::sleep(self.delay).await;
                Ok(())
            }
            PaymentScript::Decline => Err(PaymentError::Declined("card refused".to_string())),
            PaymentScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

pub fn session() -> AuthSession {
    AuthSession {
        token: "bearer-abc".to_string(),
        user_id: 42,
    }
}

pub fn sample_form() -> CampaignForm {
    CampaignForm {
        title: "School Roof".to_string(),
        description: "Fix the leaking roof before winter".to_string(),
        goal_amount: 1200.5,
        duration_months: 2,
        category: Some("education".to_string()),
        story: Some("The roof has leaked for two years.".to_string()),
        video_url: None,
        image_url: None,
    }
}

pub fn sample_file() -> StagedFile {
    StagedFile {
        name: "roof.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10],
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub api: Arc<FakeApi>,
    pub payment: Arc<FakePayment>,
}

impl Harness {
    pub fn new(api: FakeApi, payment: FakePayment) -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            api: Arc::new(api),
            payment: Arc::new(payment),
        }
    }

    pub fn approving() -> Self {
        Self::new(FakeApi::default(), FakePayment::new(PaymentScript::Approve))
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: self.storage.clone(),
            api: self.api.clone(),
            payment: self.payment.clone(),
        }
    }

    pub fn checkout(&self) -> CommitOrchestrator {
        match CommitOrchestrator::enter(Some(session()), self.collaborators()) {
            Ok(orchestrator) => orchestrator,
            Err(route) => panic!("unexpected redirect to {route:?}"),
        }
    }

    pub async fn stage(&self, image: Option<ImageSource>) {
        StagedDraft::new(sample_form(), image)
            .stage(self.storage.as_ref())
            .await
            .unwrap();
    }
}
