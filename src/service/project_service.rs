// service/project_service.rs
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        chatdb,
        db::DBClient,
        escrowdb,
        profiledb::{self, ProfileExt},
        projectdb::{self, ProjectExt},
    },
    models::{chatmodel::Conversation, escrowmodel::EscrowStatus, projectmodel::*},
    service::{audit_service::AuditService, error::ServiceError, tier_service::TierService},
};

/// Midnight UTC on the first day of `now`'s month.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[derive(Debug, Serialize)]
pub struct AcceptedBid {
    pub project: Project,
    pub bid: Bid,
    pub conversation: Conversation,
}

#[derive(Debug, Clone)]
pub struct ProjectService {
    db_client: Arc<DBClient>,
    tier_service: Arc<TierService>,
    audit_service: Arc<AuditService>,
}

impl ProjectService {
    pub fn new(
        db_client: Arc<DBClient>,
        tier_service: Arc<TierService>,
        audit_service: Arc<AuditService>,
    ) -> Self {
        Self {
            db_client,
            tier_service,
            audit_service,
        }
    }

    pub async fn create_project(
        &self,
        client_id: Uuid,
        title: &str,
        description: &str,
        budget: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Project, ServiceError> {
        if budget <= 0 {
            return Err(ServiceError::Validation("Budget must be positive".to_string()));
        }

        let project = self
            .db_client
            .create_project(client_id, title, description, budget, deadline)
            .await?;

        tracing::info!("Project {} created by client {}", project.id, client_id);
        Ok(project)
    }

    pub async fn place_bid(
        &self,
        freelancer_id: Uuid,
        project_id: Uuid,
        amount: i64,
        proposal: &str,
    ) -> Result<Bid, ServiceError> {
        let project = self
            .db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if project.status != ProjectStatus::Open {
            return Err(ServiceError::rule("Project is not accepting bids"));
        }

        if project.client_id == freelancer_id {
            return Err(ServiceError::forbidden("You cannot bid on your own project"));
        }

        self.db_client.ensure_freelancer_profile(freelancer_id).await?;

        // The profile row lock makes count-then-insert atomic per freelancer.
        let mut tx = self.db_client.begin().await?;
        let profile = profiledb::lock_freelancer_profile(&mut tx, freelancer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Freelancer profile"))?;

        if let Some(limit) = profile.tier.monthly_bid_limit() {
            let placed = projectdb::count_bids_since(&mut tx, freelancer_id, start_of_month(Utc::now())).await?;
            if placed >= limit {
                return Err(ServiceError::App {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    message: format!(
                        "Monthly bid limit reached ({} bids for {} tier)",
                        limit,
                        profile.tier.to_str()
                    ),
                });
            }
        }

        let bid = projectdb::insert_bid(&mut tx, project_id, freelancer_id, amount, proposal)
            .await
            .map_err(|e| ServiceError::conflict_on_duplicate(e, "You have already bid on this project"))?;

        tx.commit().await?;

        tracing::info!("Bid {} of {} placed on project {}", bid.id, amount, project_id);
        Ok(bid)
    }

    /// Accepts one bid, rejects the rest, assigns the freelancer and opens the
    /// project conversation, all in one transaction.
    pub async fn accept_bid(&self, client_id: Uuid, bid_id: Uuid) -> Result<AcceptedBid, ServiceError> {
        let snapshot = self
            .db_client
            .get_bid(bid_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bid"))?;

        let mut tx = self.db_client.begin().await?;

        let project = projectdb::lock_project(&mut tx, snapshot.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if project.client_id != client_id {
            return Err(ServiceError::forbidden("Only the project owner can accept bids"));
        }

        if project.status != ProjectStatus::Open {
            return Err(ServiceError::rule("Project is not open for bids"));
        }

        let bid = projectdb::lock_bid(&mut tx, bid_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bid"))?;

        if bid.status != BidStatus::Pending {
            return Err(ServiceError::rule("Only pending bids can be accepted"));
        }

        let bid = projectdb::set_bid_status(&mut tx, bid.id, BidStatus::Accepted).await?;
        let rejected = projectdb::reject_competing_bids(&mut tx, project.id, bid.id).await?;
        let project = projectdb::assign_freelancer(&mut tx, project.id, bid.freelancer_id).await?;
        let conversation =
            chatdb::upsert_conversation(&mut tx, project.id, project.client_id, bid.freelancer_id).await?;

        tx.commit().await?;

        tracing::info!(
            "Bid {} accepted on project {} ({} competing bids rejected)",
            bid.id,
            project.id,
            rejected
        );

        Ok(AcceptedBid {
            project,
            bid,
            conversation,
        })
    }

    pub async fn deliver(&self, freelancer_id: Uuid, project_id: Uuid) -> Result<Project, ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let mut project = projectdb::lock_project(&mut tx, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if project.freelancer_id != Some(freelancer_id) {
            return Err(ServiceError::forbidden("Only the assigned freelancer can deliver"));
        }

        if project.status != ProjectStatus::InProgress {
            return Err(ServiceError::rule("Only in-progress projects can be delivered"));
        }

        projectdb::set_project_status(&mut tx, project.id, ProjectStatus::Delivered).await?;
        tx.commit().await?;

        project.status = ProjectStatus::Delivered;
        tracing::info!("Project {} delivered by {}", project.id, freelancer_id);
        Ok(project)
    }

    pub async fn submit_review(
        &self,
        client_id: Uuid,
        project_id: Uuid,
        rating: i32,
        comment: &str,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation("Rating must be between 1 and 5".to_string()));
        }

        let project = self
            .db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if project.client_id != client_id {
            return Err(ServiceError::forbidden("Only the client can review this project"));
        }

        if project.status != ProjectStatus::Completed {
            return Err(ServiceError::rule("Only completed projects can be reviewed"));
        }

        let freelancer_id = project
            .freelancer_id
            .ok_or_else(|| ServiceError::rule("Project has no assigned freelancer"))?;

        let review = self
            .db_client
            .create_review(project.id, client_id, freelancer_id, rating, comment)
            .await
            .map_err(|e| ServiceError::conflict_on_duplicate(e, "This project has already been reviewed"))?;

        tracing::info!("Review {} ({} stars) left on project {}", review.id, rating, project.id);

        self.tier_service.recalculate_best_effort(freelancer_id).await;

        Ok(review)
    }

    /// Removes a project and everything hanging off it, unless its escrow
    /// holds money or has paid it out.
    pub async fn admin_delete_project(&self, admin_id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let project = projectdb::lock_project(&mut tx, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        let escrow = escrowdb::lock_escrow_by_project(&mut tx, project.id).await?;
        if let Some(escrow) = &escrow {
            if matches!(escrow.status, EscrowStatus::Funded | EscrowStatus::Disputed) {
                return Err(ServiceError::rule(
                    "Cannot delete a project whose escrow is funded or disputed",
                ));
            }
            // Released escrows back the freelancer's balance and payouts.
            if escrow.status == EscrowStatus::Released {
                return Err(ServiceError::rule(
                    "Cannot delete a project whose escrow has been released",
                ));
            }
        }

        projectdb::delete_project(&mut tx, project.id).await?;

        tx.commit().await?;

        tracing::info!("Project {} deleted by admin {}", project.id, admin_id);

        self.audit_service
            .try_log_admin_action(
                admin_id,
                "delete_project",
                "project",
                project.id,
                Some(serde_json::json!({
                    "title": project.title,
                    "status": project.status,
                    "escrow_status": escrow.as_ref().map(|e| e.status),
                })),
            )
            .await;

        Ok(())
    }
}
