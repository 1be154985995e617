use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::checkout::{CheckoutState, CommitOrchestrator};
use crate::draft::ImageSource;
use crate::errors::{CheckoutError, PaymentError, RemoteError};
use crate::storage::{DRAFT_KEYS, FORM_DATA_KEY};
use crate::test_support::{
    sample_file, session, FakeApi, FakePayment, Harness, PaymentScript,
};
use crate::types::{AuthSession, NoticeLevel, PaymentMethod, Route};

fn draft_keys_present(harness: &Harness) -> bool {
    harness.storage.contains(FORM_DATA_KEY)
}

#[tokio::test(start_paused = true)]
async fn test_enter_without_identity_redirects() {
    let harness = Harness::approving();
    let result = CommitOrchestrator::enter(None, harness.collaborators());
    assert!(matches!(result, Err(Route::SignIn)));
}

#[tokio::test(start_paused = true)]
async fn test_commit_without_method_is_refused() {
    let harness = Harness::approving();
    harness.stage(None).await;
    let checkout = harness.checkout();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::NoMethodSelected));
    assert_eq!(err.notice().title, "Select Payment Method");
    assert_eq!(err.notice().level, NoticeLevel::Warning);

    assert_eq!(checkout.state(), CheckoutState::MethodUnselected);
    assert_eq!(harness.payment.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.api.create_count(), 0);
    assert!(draft_keys_present(&harness));
}

#[tokio::test(start_paused = true)]
async fn test_selecting_method_has_no_side_effects() {
    let harness = Harness::approving();
    let checkout = harness.checkout();
    assert_eq!(checkout.state(), CheckoutState::MethodUnselected);

    checkout.select_method(PaymentMethod::PayPal).unwrap();
    checkout.select_method(PaymentMethod::Square).unwrap();

    assert_eq!(
        checkout.state(),
        CheckoutState::MethodSelected(PaymentMethod::Square)
    );
    assert!(checkout.attempt().can_commit());
    assert_eq!(harness.payment.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.api.create_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_successful_commit_with_file_clears_draft() {
    let harness = Harness::approving();
    harness
        .stage(Some(ImageSource::File(sample_file())))
        .await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let committed = checkout.commit().await.unwrap();

    assert_eq!(committed.campaign.title, "School Roof");
    assert_eq!(committed.next, Route::Referrals);
    assert_eq!(committed.notice.level, NoticeLevel::Success);
    assert!(committed.notice.text.contains("\"School Roof\""));
    assert_eq!(committed.notice.steps.len(), 4);
    assert_eq!(checkout.state(), CheckoutState::Committed);

    let calls = harness.api.create_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (payload, token) = &calls[0];
    assert_eq!(token, &session().token);
    assert_eq!(payload.field("goal_amount"), Some("1200.5"));
    assert_eq!(payload.field("video_url"), Some(""));
    assert_eq!(payload.field("image_url"), None);
    assert_eq!(payload.image_file.as_ref(), Some(&sample_file()));

    for key in DRAFT_KEYS {
        assert!(!harness.storage.contains(key), "{key} should be cleared");
    }
}

#[tokio::test(start_paused = true)]
async fn test_successful_commit_with_image_url() {
    let harness = Harness::approving();
    let url = "https://cdn.example/roof.jpg".to_string();
    harness.stage(Some(ImageSource::Url(url.clone()))).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::Square).unwrap();

    checkout.commit().await.unwrap();

    let calls = harness.api.create_calls.lock().unwrap();
    let (payload, _) = &calls[0];
    assert_eq!(payload.field("image_url"), Some(url.as_str()));
    assert!(payload.image_file.is_none());
    assert!(harness.storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_commit_keeps_draft_for_retry() {
    let api = FakeApi::default().failing_create(RemoteError::Transport("connection reset".into()));
    let harness = Harness::new(api, FakePayment::new(PaymentScript::Approve));
    harness
        .stage(Some(ImageSource::File(sample_file())))
        .await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Transient(_)));
    assert_eq!(err.notice().level, NoticeLevel::Error);
    assert_eq!(
        checkout.state(),
        CheckoutState::MethodSelected(PaymentMethod::PayPal)
    );
    for key in DRAFT_KEYS {
        assert!(harness.storage.contains(key), "{key} should survive a failure");
    }

    // Same draft, second attempt.
    checkout.commit().await.unwrap();
    let calls = harness.api.create_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, calls[1].0);
    assert!(harness.storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_validation_rejection_guides_user() {
    let api = FakeApi::default().failing_create(RemoteError::Rejected(
        r#"{"error":"2 validation errors for CampaignCreate"}"#.into(),
    ));
    let harness = Harness::new(api, FakePayment::new(PaymentScript::Approve));
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::Square).unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
    assert!(err.notice().text.starts_with("Please check your campaign details"));
    assert!(draft_keys_present(&harness));
}

#[tokio::test(start_paused = true)]
async fn test_missing_draft_is_a_recoverable_warning() {
    let harness = Harness::approving();
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::DraftMissing));
    assert_eq!(err.notice().level, NoticeLevel::Warning);
    assert_eq!(harness.api.create_count(), 0);
    assert_eq!(
        checkout.state(),
        CheckoutState::MethodSelected(PaymentMethod::PayPal)
    );
}

#[tokio::test(start_paused = true)]
async fn test_declined_payment_skips_creation() {
    let harness = Harness::new(FakeApi::default(), FakePayment::new(PaymentScript::Decline));
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(PaymentError::Declined(_))));
    assert_eq!(harness.api.create_count(), 0);
    assert!(draft_keys_present(&harness));
}

#[tokio::test(start_paused = true)]
async fn test_payment_timeout_fails_attempt() {
    let harness = Harness::new(FakeApi::default(), FakePayment::new(PaymentScript::Hang));
    harness.stage(None).await;
    let checkout = harness
        .checkout()
        .with_payment_timeout(Duration::from_secs(30));
    checkout.select_method(PaymentMethod::Square).unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(PaymentError::TimedOut)));
    assert_eq!(harness.api.create_count(), 0);
    assert!(draft_keys_present(&harness));
    assert!(checkout.attempt().can_commit());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_submission_is_refused() {
    let harness = Harness::approving();
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let (first, second) = tokio::join!(checkout.commit(), checkout.commit());

    let outcomes = [first, second];
    let committed = outcomes.iter().filter(|r| r.is_ok()).count();
    let refused = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CheckoutError::AlreadyProcessing)))
        .count();
    assert_eq!((committed, refused), (1, 1));
    assert_eq!(harness.payment.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.api.create_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_method_change_refused_while_processing() {
    let harness = Harness::new(FakeApi::default(), FakePayment::new(PaymentScript::Hang));
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let in_flight = checkout.commit();
    tokio::pin!(in_flight);
    assert!(futures_poll_once(in_flight.as_mut()).await);

    assert_eq!(
        checkout.state(),
        CheckoutState::Processing(PaymentMethod::PayPal)
    );
    assert!(matches!(
        checkout.select_method(PaymentMethod::Square),
        Err(CheckoutError::AlreadyProcessing)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_commit_releases_guard() {
    let harness = Harness::new(FakeApi::default(), FakePayment::new(PaymentScript::Hang));
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::Square).unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), checkout.commit()).await;
    assert!(abandoned.is_err());

    assert!(!checkout.attempt().is_processing);
    assert_eq!(
        checkout.state(),
        CheckoutState::MethodSelected(PaymentMethod::Square)
    );
    assert!(draft_keys_present(&harness));
}

#[tokio::test(start_paused = true)]
async fn test_identity_loss_redirects_and_blocks_commit() {
    let harness = Harness::approving();
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    assert_eq!(checkout.observe_identity(Some(session())), None);
    assert_eq!(checkout.observe_identity(None), Some(Route::SignIn));
    assert_eq!(checkout.state(), CheckoutState::Unauthenticated);

    let err = checkout.commit().await.unwrap_err();
    assert!(err.requires_sign_in());
    assert_eq!(harness.payment.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.api.create_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_different_user_cannot_take_over_checkout() {
    let harness = Harness::approving();
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();

    let intruder = AuthSession {
        token: "bearer-other".to_string(),
        user_id: session().user_id + 1,
    };
    assert_eq!(checkout.observe_identity(Some(intruder)), Some(Route::SignIn));
    assert_eq!(checkout.state(), CheckoutState::Unauthenticated);

    let err = checkout.commit().await.unwrap_err();
    assert!(err.requires_sign_in());
    assert_eq!(harness.api.create_count(), 0);
    assert!(draft_keys_present(&harness));
}

#[tokio::test(start_paused = true)]
async fn test_commit_after_success_is_refused() {
    let harness = Harness::approving();
    harness.stage(None).await;
    let checkout = harness.checkout();
    checkout.select_method(PaymentMethod::PayPal).unwrap();
    checkout.commit().await.unwrap();

    let err = checkout.commit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::AlreadyCommitted));
    assert_eq!(harness.api.create_count(), 1);
}

/// Poll a future exactly once; `true` if it is still pending.
async fn futures_poll_once<F: std::future::Future>(fut: std::pin::Pin<&mut F>) -> bool {
    let mut fut = Some(fut);
    std::future::poll_fn(move |cx| {
        let pending = fut
            .take()
            .map(|f| f.poll(cx).is_pending())
            .unwrap_or(false);
        std::task::Poll::Ready(pending)
    })
    .await
}
