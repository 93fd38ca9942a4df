// Database scenarios need a live Postgres: DATABASE_URL=... cargo test -- --ignored
mod common;

use chrono::{Duration, Utc};
use rekber::{
    db::{disputedb::DisputeExt, payoutdb::PayoutExt, projectdb::ProjectExt},
    models::{
        disputemodel::{DisputeOutcome, DisputeStatus},
        escrowmodel::EscrowStatus,
        projectmodel::ProjectStatus,
        usermodel::UserRole,
    },
    service::{error::ServiceError, escrow_service::WebhookOutcome},
};
use sqlx::PgPool;

use common::*;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_full_refund_cancels_project(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 2_000_000).await;
    let escrow = seed_funded_escrow(&state, &project).await;
    assert_eq!(escrow.status, EscrowStatus::Funded);

    let dispute = state
        .dispute_service
        .create_dispute(client.id, project.id, "QUALITY", "The delivered work does not match the brief")
        .await
        .unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
    assert!(!dispute.is_system_generated);

    let err = state
        .dispute_service
        .create_dispute(freelancer.id, project.id, "PAYMENT", "Client refuses to release payment")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Disputed);

    // Disputed money cannot be released by the client
    let err = state
        .escrow_service
        .release(escrow.id, client.id)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Escrow is not funded");

    let resolved = state
        .dispute_service
        .resolve_dispute(dispute.id, admin.id, "Client refunded in full", DisputeOutcome::FullRefund)
        .await
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.resolved_by, Some(admin.id));

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Refunded);

    let project = state.db_client.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Cancelled);
    assert_eq!(state.db_client.get_balance(freelancer.id).await.unwrap(), 0);

    let err = state
        .dispute_service
        .resolve_dispute(dispute.id, admin.id, "Resolving twice", DisputeOutcome::NoRefund)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Dispute is already resolved");

    let actions = state.audit_service.get_admin_actions(dispute.id).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, "resolve_dispute");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_payment_during_dispute_keeps_it_disputed(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 1_000_000).await;

    let checkout = state
        .escrow_service
        .create(project.id, client.id)
        .await
        .unwrap();

    let dispute = state
        .dispute_service
        .create_dispute(freelancer.id, project.id, "SCOPE", "Client keeps adding features to the scope")
        .await
        .unwrap();

    // Nothing was paid yet, so only a full refund is possible
    let err = state
        .dispute_service
        .resolve_dispute(dispute.id, admin.id, "Pay the freelancer", DisputeOutcome::NoRefund)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Escrow was never funded; only a full refund is possible");

    let outcome = state
        .escrow_service
        .handle_webhook(&settlement_for(&checkout.escrow))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Funded(checkout.escrow.id));

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Disputed);
    assert!(escrow.funded_at.is_some());

    state
        .dispute_service
        .resolve_dispute(dispute.id, admin.id, "Work was delivered as agreed", DisputeOutcome::NoRefund)
        .await
        .unwrap();

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);

    // No payout is synthesized; the amount becomes withdrawable
    assert_eq!(
        state.db_client.get_balance(freelancer.id).await.unwrap(),
        escrow.freelancer_amount
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_dispute_access_rules(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let stranger = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 400_000).await;

    let err = state
        .dispute_service
        .create_dispute(stranger.id, project.id, "OTHER", "I am not part of this project")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let dispute = state
        .dispute_service
        .create_dispute(client.id, project.id, "DEADLINE", "Nothing has been delivered so far")
        .await
        .unwrap();

    let err = state
        .dispute_service
        .get_dispute(dispute.id, stranger.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    assert!(state.dispute_service.get_dispute(dispute.id, freelancer.id, false).await.is_ok());
    assert!(state.dispute_service.get_dispute(dispute.id, admin.id, true).await.is_ok());

    // Open projects cannot be disputed
    let open = state
        .project_service
        .create_project(client.id, "Open project", "Still collecting bids for this", 100_000, None)
        .await
        .unwrap();
    let err = state
        .dispute_service
        .create_dispute(client.id, open.id, "OTHER", "Trying to dispute an open project")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Project cannot be disputed in its current status");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_sweep_opens_one_dispute_per_project(pool: PgPool) {
    let (state, _gateway) = build_state(pool.clone());
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;

    let ghosted = seed_in_progress_project(&state, &client, &freelancer, 700_000).await;
    let escrow = seed_funded_escrow(&state, &ghosted).await;
    sqlx::query("UPDATE escrows SET funded_at = NOW() - INTERVAL '6 days' WHERE id = $1")
        .bind(escrow.id)
        .execute(&pool)
        .await
        .unwrap();

    let overdue = state
        .project_service
        .create_project(
            client.id,
            "Overdue project",
            "This one has a deadline in the past",
            600_000,
            Some(Utc::now() - Duration::days(2)),
        )
        .await
        .unwrap();
    let bid = state
        .project_service
        .place_bid(freelancer.id, overdue.id, 600_000, "Happy to take this one on")
        .await
        .unwrap();
    state.project_service.accept_bid(client.id, bid.id).await.unwrap();

    let healthy = seed_in_progress_project(&state, &client, &freelancer, 500_000).await;
    seed_funded_escrow(&state, &healthy).await;

    let created = state.dispute_service.run_auto_dispute_sweep().await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|d| d.is_system_generated));

    let ghosted_dispute = state
        .db_client
        .get_active_dispute(ghosted.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ghosted_dispute.reason, "NO_COMMUNICATION");

    let overdue_dispute = state
        .db_client
        .get_active_dispute(overdue.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(overdue_dispute.reason, "DEADLINE_EXCEEDED");

    let escrow = state
        .escrow_service
        .get_escrow_for_project(ghosted.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Disputed);

    assert!(state.db_client.get_active_dispute(healthy.id).await.unwrap().is_none());

    // A second sweep finds nothing new
    let created = state.dispute_service.run_auto_dispute_sweep().await.unwrap();
    assert!(created.is_empty());
    assert_eq!(state.db_client.get_project_disputes(ghosted.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_refund_releases_without_payout(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 1_500_000).await;
    let escrow = seed_funded_escrow(&state, &project).await;

    let dispute = state
        .dispute_service
        .create_dispute(client.id, project.id, "QUALITY", "Only half of the pages were delivered")
        .await
        .unwrap();

    let resolved = state
        .dispute_service
        .resolve_dispute(dispute.id, admin.id, "Split settled by support", DisputeOutcome::PartialRefund)
        .await
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.outcome, Some(DisputeOutcome::PartialRefund));

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);

    let project = state.db_client.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);

    assert!(state.db_client.get_payouts_for_escrow(escrow.id).await.unwrap().is_empty());
    assert_eq!(
        state.db_client.get_balance(freelancer.id).await.unwrap(),
        escrow.freelancer_amount
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_unfunded_escrow_only_allows_full_refund(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 700_000).await;

    state
        .escrow_service
        .create(project.id, client.id)
        .await
        .unwrap();
    let dispute = state
        .dispute_service
        .create_dispute(freelancer.id, project.id, "PAYMENT", "Client never completed the checkout")
        .await
        .unwrap();

    for outcome in [DisputeOutcome::NoRefund, DisputeOutcome::PartialRefund] {
        let err = state
            .dispute_service
            .resolve_dispute(dispute.id, admin.id, "Pay the freelancer", outcome)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Escrow was never funded; only a full refund is possible");
    }

    let unchanged = state.db_client.get_dispute(dispute.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, DisputeStatus::Open);
    assert!(unchanged.resolved_by.is_none());

    let escrow = state
        .escrow_service
        .get_escrow_for_project(project.id, client.id)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Disputed);
    assert!(escrow.funded_at.is_none());

    let project = state.db_client.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Disputed);
    assert_eq!(state.db_client.get_balance(freelancer.id).await.unwrap(), 0);
}
