//! End-to-end settlement flows: funding, submission, review, escrow release,
//! project completion, and the double-approval race.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement::notify::{ChannelSink, NotificationKind};
use settlement::projects::{InMemoryProjectDirectory, ProjectDirectory};
use settlement::{
    Config, Error, Milestone, MilestoneStatus, ProjectRecord, ProjectStatus, ReviewDecision,
    SettlementEngine,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;
use wallet_core::{Caller, Role, WalletService};

struct Fixture {
    engine: Arc<SettlementEngine>,
    wallet: Arc<WalletService>,
    projects: Arc<InMemoryProjectDirectory>,
    notifications: mpsc::Receiver<settlement::notify::Notification>,
    client: Caller,
    freelancer: Caller,
    project_id: Uuid,
    _temp: TempDir,
}

/// One client, one freelancer, one in-progress project. Wallets start empty.
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();

    let mut config = Config::default();
    config.milestone_data_dir = temp.path().join("milestones");
    config.wallet.data_dir = temp.path().join("wallets");

    let wallet = Arc::new(WalletService::open(config.wallet.clone()).unwrap());
    let projects = Arc::new(InMemoryProjectDirectory::new());
    let (sink, notifications) = ChannelSink::new(32);

    let client = Caller::new(Uuid::new_v4(), Role::Client);
    let freelancer = Caller::new(Uuid::new_v4(), Role::Freelancer);

    let project = ProjectRecord::assigned(Uuid::new_v4(), client.user_id, freelancer.user_id);
    let project_id = project.project_id;
    projects.upsert(project);

    let engine = Arc::new(
        SettlementEngine::new(config, wallet.clone(), projects.clone(), Arc::new(sink)).unwrap(),
    );

    Fixture {
        engine,
        wallet,
        projects,
        notifications,
        client,
        freelancer,
        project_id,
        _temp: temp,
    }
}

async fn submitted_milestone(fx: &Fixture, amount: Decimal) -> Milestone {
    let milestone = fx
        .engine
        .add_milestone(
            &fx.client,
            fx.project_id,
            "Landing page",
            "Hero, pricing, footer",
            amount,
            None,
        )
        .await
        .unwrap();

    fx.engine
        .submit(&fx.freelancer, milestone.milestone_id)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_deposit_then_balance() {
    let fx = fixture();

    let balance = fx.wallet.deposit(&fx.client, dec!(500.00)).await.unwrap();
    assert_eq!(balance, dec!(500.00));

    let details = fx.wallet.details(fx.client.user_id).await.unwrap();
    assert_eq!(details.balance, dec!(500.00));
    assert_eq!(details.transactions.len(), 1);
}

#[tokio::test]
async fn test_overdraw_withdrawal_rejected() {
    let fx = fixture();

    let err = fx
        .wallet
        .withdraw(&fx.freelancer, dec!(50.00))
        .await
        .unwrap_err();
    assert!(matches!(err, wallet_core::Error::InsufficientFunds { .. }));

    let details = fx.wallet.details(fx.freelancer.user_id).await.unwrap();
    assert_eq!(details.balance, Decimal::ZERO);
    assert!(details.transactions.is_empty());
}

#[tokio::test]
async fn test_approval_releases_escrow_and_completes_project() {
    let mut fx = fixture();

    fx.wallet.deposit(&fx.client, dec!(300.00)).await.unwrap();
    let milestone = submitted_milestone(&fx, dec!(300.00)).await;

    let approved = fx
        .engine
        .review(&fx.client, milestone.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap();
    assert_eq!(approved.status, MilestoneStatus::Approved);

    let client_details = fx.wallet.details(fx.client.user_id).await.unwrap();
    let freelancer_details = fx.wallet.details(fx.freelancer.user_id).await.unwrap();
    assert_eq!(client_details.balance, Decimal::ZERO);
    assert_eq!(freelancer_details.balance, dec!(300.00));

    // Only milestone approved, so the project closes
    let project = fx.projects.get(fx.project_id).unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);

    // Submission notice to the client, then the payment notice
    let submit_note = fx.notifications.recv().await.unwrap();
    assert_eq!(submit_note.kind, NotificationKind::MilestoneUpdate);
    assert_eq!(submit_note.recipient, fx.client.user_id);

    let payment_note = fx.notifications.recv().await.unwrap();
    assert_eq!(payment_note.kind, NotificationKind::PaymentReceived);
    assert_eq!(payment_note.recipient, fx.freelancer.user_id);
    assert!(payment_note.message.contains("300"));
}

#[tokio::test]
async fn test_underfunded_approval_fails_then_retry_succeeds() {
    let fx = fixture();

    fx.wallet.deposit(&fx.client, dec!(100.00)).await.unwrap();
    let milestone = submitted_milestone(&fx, dec!(300.00)).await;

    let err = fx
        .engine
        .review(&fx.client, milestone.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PaymentFailed(_)));

    // Nothing moved, milestone still awaiting review
    let listed = fx.engine.list_for_project(fx.project_id).await.unwrap();
    assert_eq!(listed[0].status, MilestoneStatus::SubmittedForReview);
    let client_details = fx.wallet.details(fx.client.user_id).await.unwrap();
    assert_eq!(client_details.balance, dec!(100.00));
    assert_eq!(client_details.transactions.len(), 1);

    // Top up and retry the same review
    fx.wallet.deposit(&fx.client, dec!(200.00)).await.unwrap();
    let approved = fx
        .engine
        .review(&fx.client, milestone.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap();
    assert_eq!(approved.status, MilestoneStatus::Approved);

    let freelancer_details = fx.wallet.details(fx.freelancer.user_id).await.unwrap();
    assert_eq!(freelancer_details.balance, dec!(300.00));
}

#[tokio::test]
async fn test_concurrent_approvals_pay_exactly_once() {
    let fx = fixture();

    fx.wallet.deposit(&fx.client, dec!(1000.00)).await.unwrap();
    let milestone = submitted_milestone(&fx, dec!(300.00)).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = fx.engine.clone();
        let client = fx.client;
        let milestone_id = milestone.milestone_id;
        handles.push(tokio::spawn(async move {
            engine
                .review(&client, milestone_id, ReviewDecision::Approved)
                .await
        }));
    }

    let mut approvals = 0;
    let mut invalid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(m) => {
                assert_eq!(m.status, MilestoneStatus::Approved);
                approvals += 1;
            }
            Err(Error::InvalidTransition { from, .. }) => {
                assert_eq!(from, MilestoneStatus::Approved);
                invalid += 1;
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
    assert_eq!(approvals, 1);
    assert_eq!(invalid, 1);

    // Exactly one payment pair
    let freelancer_details = fx.wallet.details(fx.freelancer.user_id).await.unwrap();
    assert_eq!(freelancer_details.balance, dec!(300.00));
    assert_eq!(freelancer_details.transactions.len(), 1);
    let client_details = fx.wallet.details(fx.client.user_id).await.unwrap();
    assert_eq!(client_details.balance, dec!(700.00));
}

#[tokio::test]
async fn test_project_completes_only_when_all_approved() {
    let fx = fixture();

    fx.wallet.deposit(&fx.client, dec!(500.00)).await.unwrap();

    let first = submitted_milestone(&fx, dec!(200.00)).await;
    let second = fx
        .engine
        .add_milestone(
            &fx.client,
            fx.project_id,
            "API integration",
            "Wire up the backend",
            dec!(300.00),
            None,
        )
        .await
        .unwrap();

    fx.engine
        .review(&fx.client, first.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap();
    assert_eq!(
        fx.projects.get(fx.project_id).unwrap().unwrap().status,
        ProjectStatus::InProgress
    );

    fx.engine
        .submit(&fx.freelancer, second.milestone_id)
        .await
        .unwrap();
    fx.engine
        .review(&fx.client, second.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap();
    assert_eq!(
        fx.projects.get(fx.project_id).unwrap().unwrap().status,
        ProjectStatus::Completed
    );
}

#[tokio::test]
async fn test_revision_request_and_resubmit() {
    let mut fx = fixture();

    let milestone = submitted_milestone(&fx, dec!(100.00)).await;

    let revised = fx
        .engine
        .review(
            &fx.client,
            milestone.milestone_id,
            ReviewDecision::RevisionRequested,
        )
        .await
        .unwrap();
    assert_eq!(revised.status, MilestoneStatus::RevisionRequested);

    // Skip the submit notification, then expect the revision notice
    fx.notifications.recv().await.unwrap();
    let note = fx.notifications.recv().await.unwrap();
    assert_eq!(note.kind, NotificationKind::MilestoneUpdate);
    assert_eq!(note.recipient, fx.freelancer.user_id);

    // Freelancer may resubmit after revision
    let resubmitted = fx
        .engine
        .submit(&fx.freelancer, milestone.milestone_id)
        .await
        .unwrap();
    assert_eq!(resubmitted.status, MilestoneStatus::SubmittedForReview);
}

#[tokio::test]
async fn test_role_enforcement() {
    let fx = fixture();

    let milestone = fx
        .engine
        .add_milestone(
            &fx.client,
            fx.project_id,
            "Landing page",
            "desc",
            dec!(100.00),
            None,
        )
        .await
        .unwrap();

    // Client cannot submit their own milestone
    let err = fx
        .engine
        .submit(&fx.client, milestone.milestone_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    // A stranger with the right role cannot submit either
    let stranger = Caller::new(Uuid::new_v4(), Role::Freelancer);
    let err = fx
        .engine
        .submit(&stranger, milestone.milestone_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    fx.engine
        .submit(&fx.freelancer, milestone.milestone_id)
        .await
        .unwrap();

    // Freelancer cannot review
    let err = fx
        .engine
        .review(
            &fx.freelancer,
            milestone.milestone_id,
            ReviewDecision::Approved,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    // Non-client cannot add milestones
    let err = fx
        .engine
        .add_milestone(
            &fx.freelancer,
            fx.project_id,
            "bogus",
            "desc",
            dec!(100.00),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_submit_without_assigned_freelancer() {
    let fx = fixture();

    let client = Caller::new(Uuid::new_v4(), Role::Client);
    let open_project = ProjectRecord::open(Uuid::new_v4(), client.user_id);
    let open_id = open_project.project_id;
    fx.projects.upsert(open_project);

    let milestone = fx
        .engine
        .add_milestone(&client, open_id, "draft", "desc", dec!(100.00), None)
        .await
        .unwrap();

    let hopeful = Caller::new(Uuid::new_v4(), Role::Freelancer);
    let err = fx
        .engine
        .submit(&hopeful, milestone.milestone_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_review_before_submission_rejected() {
    let fx = fixture();

    let milestone = fx
        .engine
        .add_milestone(
            &fx.client,
            fx.project_id,
            "Landing page",
            "desc",
            dec!(100.00),
            None,
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .review(&fx.client, milestone.milestone_id, ReviewDecision::Approved)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: MilestoneStatus::Pending,
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_milestone_and_project() {
    let fx = fixture();

    let err = fx
        .engine
        .submit(&fx.freelancer, Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = fx
        .engine
        .add_milestone(
            &fx.client,
            Uuid::new_v4(),
            "orphan",
            "desc",
            dec!(100.00),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_nonpositive_milestone_amount_rejected() {
    let fx = fixture();

    for amount in [Decimal::ZERO, dec!(-50.00)] {
        let err = fx
            .engine
            .add_milestone(&fx.client, fx.project_id, "bad", "desc", amount, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }
}
