// Database scenarios need a live Postgres: DATABASE_URL=... cargo test -- --ignored
mod common;

use axum::http::StatusCode;
use futures::future::join_all;
use rekber::{
    db::{chatdb::ChatExt, profiledb::ProfileExt, projectdb::ProjectExt},
    models::{
        chatmodel::{FlagType, MessageType},
        escrowmodel::EscrowStatus,
        profilemodel::Tier,
        projectmodel::{BidStatus, ProjectStatus},
        usermodel::UserRole,
    },
    service::{chat_filter::REDACTION_TOKEN, error::ServiceError},
};
use sqlx::PgPool;

use common::*;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_accepting_a_bid_rejects_the_others(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let first = seed_user(&state, UserRole::Freelancer).await;
    let second = seed_user(&state, UserRole::Freelancer).await;

    let project = state
        .project_service
        .create_project(client.id, "Mobile app", "A small Flutter app for a laundry shop", 5_000_000, None)
        .await
        .unwrap();

    let err = state
        .project_service
        .place_bid(client.id, project.id, 4_000_000, "Bidding on my own project")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let winning = state
        .project_service
        .place_bid(first.id, project.id, 4_500_000, "Six weeks, fixed price")
        .await
        .unwrap();
    let losing = state
        .project_service
        .place_bid(second.id, project.id, 4_800_000, "Five weeks with weekly demos")
        .await
        .unwrap();

    let err = state
        .project_service
        .place_bid(first.id, project.id, 4_400_000, "Lowering my earlier bid")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = state
        .project_service
        .accept_bid(second.id, winning.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let accepted = state
        .project_service
        .accept_bid(client.id, winning.id)
        .await
        .unwrap();
    assert_eq!(accepted.bid.status, BidStatus::Accepted);
    assert_eq!(accepted.project.status, ProjectStatus::InProgress);
    assert_eq!(accepted.project.freelancer_id, Some(first.id));
    assert!(!accepted.conversation.escrow_active);

    let losing = state.db_client.get_bid(losing.id).await.unwrap().unwrap();
    assert_eq!(losing.status, BidStatus::Rejected);

    let err = state
        .project_service
        .accept_bid(client.id, losing.id)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Project is not open for bids");

    let err = state
        .project_service
        .deliver(second.id, project.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_monthly_bid_quota(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;

    let limit = Tier::Bronze.monthly_bid_limit().unwrap();
    for i in 0..limit {
        let project = state
            .project_service
            .create_project(client.id, &format!("Task {}", i), "Small data entry task", 100_000, None)
            .await
            .unwrap();
        state
            .project_service
            .place_bid(freelancer.id, project.id, 100_000, "Can start right away")
            .await
            .unwrap();
    }

    let project = state
        .project_service
        .create_project(client.id, "One more", "Another small data entry task", 100_000, None)
        .await
        .unwrap();
    let err = state
        .project_service
        .place_bid(freelancer.id, project.id, 100_000, "Can start right away")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert!(err.to_string().starts_with("Monthly bid limit reached"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_bids_respect_quota(pool: PgPool) {
    let (state, _gateway) = build_state(pool.clone());
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;

    let limit = Tier::Bronze.monthly_bid_limit().unwrap();
    let mut projects = Vec::new();
    for i in 0..limit + 4 {
        let project = state
            .project_service
            .create_project(client.id, &format!("Batch {}", i), "Short copywriting job", 150_000, None)
            .await
            .unwrap();
        projects.push(project);
    }

    // One slot left before the burst
    for project in &projects[..(limit - 1) as usize] {
        state
            .project_service
            .place_bid(freelancer.id, project.id, 150_000, "Available this week")
            .await
            .unwrap();
    }

    let burst = projects[(limit - 1) as usize..].iter().map(|project| {
        state
            .project_service
            .place_bid(freelancer.id, project.id, 150_000, "Available this week")
    });
    let results = join_all(burst).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS, "unexpected error: {:?}", err);
    }

    let placed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bids WHERE freelancer_id = $1")
        .bind(freelancer.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(placed, limit);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_chat_is_blocked_then_redacted(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let stranger = seed_user(&state, UserRole::Client).await;
    let project = seed_in_progress_project(&state, &client, &freelancer, 900_000).await;

    let conversation = state
        .chat_service
        .get_project_conversation(project.id, client.id)
        .await
        .unwrap();

    let err = state
        .chat_service
        .send_message(stranger.id, conversation.id, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let clean = state
        .chat_service
        .send_message(client.id, conversation.id, "Can you share a draft by Friday?")
        .await
        .unwrap();
    assert!(!clean.is_blocked);
    assert!(clean.flags.is_empty());

    let blocked = state
        .chat_service
        .send_message(freelancer.id, conversation.id, "Call me at 081234567890")
        .await
        .unwrap();
    assert!(blocked.is_blocked);
    assert_eq!(blocked.message.message_type, MessageType::System);
    assert_eq!(blocked.message.content, "");
    assert_eq!(blocked.message.original_content.as_deref(), Some("Call me at 081234567890"));

    let flags = state.db_client.get_message_flags(blocked.message.id).await.unwrap();
    assert!(flags.iter().any(|f| f.flag_type == FlagType::Phone));

    // The blocked record is only visible to whoever sent it
    let for_client = state
        .chat_service
        .list_messages(client.id, conversation.id, 50, 0)
        .await
        .unwrap();
    assert_eq!(for_client.len(), 1);
    let for_freelancer = state
        .chat_service
        .list_messages(freelancer.id, conversation.id, 50, 0)
        .await
        .unwrap();
    assert_eq!(for_freelancer.len(), 2);

    let escrow = seed_funded_escrow(&state, &project).await;
    assert_eq!(escrow.status, EscrowStatus::Funded);

    let redacted = state
        .chat_service
        .send_message(freelancer.id, conversation.id, "Call me at 081234567890 or see www.example.com")
        .await
        .unwrap();
    assert!(!redacted.is_blocked);
    assert!(redacted.message.content.contains(REDACTION_TOKEN));
    assert!(!redacted.message.content.contains("081234567890"));
    // Links are allowed once money is held
    assert!(redacted.message.content.contains("www.example.com"));

    let conversation = state
        .db_client
        .get_conversation(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.escrow_active);
    assert!(conversation.last_message_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_review_and_admin_delete(pool: PgPool) {
    let (state, _gateway) = build_state(pool);
    let client = seed_user(&state, UserRole::Client).await;
    let freelancer = seed_user(&state, UserRole::Freelancer).await;
    let admin = seed_user(&state, UserRole::Admin).await;
    state
        .db_client
        .update_bank_details(freelancer.id, &complete_bank())
        .await
        .unwrap();

    let project = seed_in_progress_project(&state, &client, &freelancer, 1_200_000).await;
    let escrow = seed_funded_escrow(&state, &project).await;

    let err = state
        .project_service
        .admin_delete_project(admin.id, project.id)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot delete a project whose escrow is funded or disputed");

    let err = state
        .project_service
        .submit_review(client.id, project.id, 5, "Great")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only completed projects can be reviewed");

    state.project_service.deliver(freelancer.id, project.id).await.unwrap();
    state.escrow_service.release(escrow.id, client.id).await.unwrap();

    let review = state
        .project_service
        .submit_review(client.id, project.id, 5, "Fast and careful work")
        .await
        .unwrap();
    assert_eq!(review.rating, 5);
    assert_eq!(review.reviewee_id, freelancer.id);

    let stored = state
        .db_client
        .get_review_for_project(project.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, review.id);

    let err = state
        .project_service
        .submit_review(client.id, project.id, 4, "Changing my mind")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let profile = state
        .db_client
        .get_freelancer_profile(freelancer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.completed_projects, 1);
    assert_eq!(profile.average_rating, 5.0);

    let err = state
        .project_service
        .admin_delete_project(admin.id, project.id)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot delete a project whose escrow has been released");

    // An unfunded escrow does not protect its project
    let abandoned = seed_in_progress_project(&state, &client, &freelancer, 300_000).await;
    state
        .escrow_service
        .create(abandoned.id, client.id)
        .await
        .unwrap();
    state
        .project_service
        .admin_delete_project(admin.id, abandoned.id)
        .await
        .unwrap();
    assert!(state.db_client.get_project(abandoned.id).await.unwrap().is_none());

    let actions = state.audit_service.get_admin_actions(abandoned.id).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, "delete_project");
}
