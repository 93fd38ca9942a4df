// service/dispute_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        disputedb::{self, DisputeExt},
        escrowdb,
        projectdb::{self, ProjectExt},
    },
    models::{auditmodel::*, disputemodel::*, escrowmodel::*, projectmodel::*},
    service::{
        audit_service::{log_transaction_in_savepoint, AuditService},
        error::ServiceError,
        tier_service::TierService,
    },
};

#[derive(Debug, Clone)]
pub struct DisputeService {
    db_client: Arc<DBClient>,
    audit_service: Arc<AuditService>,
    tier_service: Arc<TierService>,
    ghosting_days: i64,
}

impl DisputeService {
    pub fn new(
        db_client: Arc<DBClient>,
        audit_service: Arc<AuditService>,
        tier_service: Arc<TierService>,
        ghosting_days: i64,
    ) -> Self {
        Self {
            db_client,
            audit_service,
            tier_service,
            ghosting_days,
        }
    }

    pub async fn create_dispute(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        reason: &str,
        description: &str,
    ) -> Result<Dispute, ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let project = projectdb::lock_project(&mut tx, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if !project.is_participant(user_id) {
            return Err(ServiceError::forbidden("Only project participants can open a dispute"));
        }

        if disputedb::has_active_dispute(&mut tx, project_id).await? {
            return Err(ServiceError::Conflict(
                "An active dispute already exists for this project".to_string(),
            ));
        }

        if !project.status.is_disputable() {
            return Err(ServiceError::rule("Project cannot be disputed in its current status"));
        }

        let dispute = disputedb::insert_dispute(&mut tx, project_id, user_id, reason, description, false)
            .await
            .map_err(|e| {
                ServiceError::conflict_on_duplicate(e, "An active dispute already exists for this project")
            })?;

        projectdb::set_project_status(&mut tx, project_id, ProjectStatus::Disputed).await?;

        let escrow = escrowdb::lock_escrow_by_project(&mut tx, project_id).await?;
        if let Some(escrow) = &escrow {
            if escrow.status.can_transition_to(EscrowStatus::Disputed) {
                escrowdb::set_escrow_status(&mut tx, escrow.id, EscrowStatus::Disputed).await?;
            }
        }

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "dispute_opened",
                reference_id: dispute.id,
                reference_type: "dispute",
                amount: escrow.as_ref().map(|e| e.total_amount),
                from_status: escrow.as_ref().map(|e| e.status.to_str().to_string()),
                to_status: escrow.as_ref().map(|_| EscrowStatus::Disputed.to_str().to_string()),
                actor_id: Some(user_id),
                actor_type: ActorType::User,
                metadata: Some(serde_json::json!({ "project_id": project_id, "reason": reason })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!("Dispute {} opened on project {} by {}", dispute.id, project_id, user_id);
        Ok(dispute)
    }

    pub async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        admin_id: Uuid,
        resolution: &str,
        outcome: DisputeOutcome,
    ) -> Result<Dispute, ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let dispute = disputedb::lock_dispute(&mut tx, dispute_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Dispute"))?;

        if !dispute.status.is_active() {
            return Err(ServiceError::rule("Dispute is already resolved"));
        }

        let project = projectdb::lock_project(&mut tx, dispute.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        let mut escrow = escrowdb::lock_escrow_by_project(&mut tx, project.id).await?;

        // Money that settled while the dispute was opening is still under it.
        if let Some(e) = escrow.as_mut() {
            if e.status == EscrowStatus::Funded {
                escrowdb::set_escrow_status(&mut tx, e.id, EscrowStatus::Disputed).await?;
                e.status = EscrowStatus::Disputed;
            }
        }

        let target = if outcome.releases_funds() {
            EscrowStatus::Released
        } else {
            EscrowStatus::Refunded
        };

        if let Some(escrow) = &escrow {
            if !escrow.status.can_transition_to(target) {
                return Err(ServiceError::rule(format!(
                    "Escrow in status {} cannot be {}",
                    escrow.status.to_str(),
                    target.to_str()
                )));
            }
        }

        if outcome.releases_funds() && escrow.as_ref().map_or(true, |e| e.funded_at.is_none()) {
            return Err(ServiceError::rule(
                "Escrow was never funded; only a full refund is possible",
            ));
        }

        let resolved =
            disputedb::mark_dispute_resolved(&mut tx, dispute.id, resolution, outcome, admin_id).await?;

        match outcome {
            DisputeOutcome::FullRefund => {
                if let Some(escrow) = &escrow {
                    escrowdb::set_escrow_status(&mut tx, escrow.id, EscrowStatus::Refunded).await?;
                }
                projectdb::set_project_status(&mut tx, project.id, ProjectStatus::Cancelled).await?;
            }
            // The partial split is settled by the admin outside the platform.
            DisputeOutcome::NoRefund | DisputeOutcome::PartialRefund => {
                if let Some(escrow) = &escrow {
                    escrowdb::mark_escrow_released(&mut tx, escrow.id).await?;
                }
                projectdb::set_project_status(&mut tx, project.id, ProjectStatus::Completed).await?;
            }
        }

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "dispute_resolved",
                reference_id: dispute.id,
                reference_type: "dispute",
                amount: escrow.as_ref().map(|e| e.total_amount),
                from_status: escrow.as_ref().map(|e| e.status.to_str().to_string()),
                to_status: escrow.as_ref().map(|_| target.to_str().to_string()),
                actor_id: Some(admin_id),
                actor_type: ActorType::Admin,
                metadata: Some(serde_json::json!({
                    "outcome": outcome.to_str(),
                    "project_id": project.id,
                    "escrow_id": escrow.as_ref().map(|e| e.id),
                })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!(
            "Dispute {} resolved by admin {} with outcome {}",
            dispute.id,
            admin_id,
            outcome.to_str()
        );

        self.audit_service
            .try_log_admin_action(
                admin_id,
                "resolve_dispute",
                "dispute",
                dispute.id,
                Some(serde_json::json!({
                    "outcome": outcome.to_str(),
                    "resolution": resolution,
                    "project_id": project.id,
                })),
            )
            .await;

        if let Some(freelancer_id) = project.freelancer_id {
            self.tier_service.recalculate_best_effort(freelancer_id).await;
        }

        Ok(resolved)
    }

    pub async fn get_dispute(&self, dispute_id: Uuid, user_id: Uuid, is_admin: bool) -> Result<Dispute, ServiceError> {
        let dispute = self
            .db_client
            .get_dispute(dispute_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Dispute"))?;

        if !is_admin {
            let project = self
                .db_client
                .get_project(dispute.project_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Project"))?;
            if !project.is_participant(user_id) {
                return Err(ServiceError::forbidden("You are not a party to this dispute"));
            }
        }

        Ok(dispute)
    }

    /// Opens system disputes for ghosted and overdue projects. Each project is
    /// handled in its own transaction; a failure is logged and the sweep moves on.
    pub async fn run_auto_dispute_sweep(&self) -> Result<Vec<Dispute>, ServiceError> {
        let ghosted = self.db_client.find_ghosted_projects(self.ghosting_days).await?;
        let overdue = self.db_client.find_overdue_projects().await?;

        let candidates = ghosted
            .into_iter()
            .map(|c| (c, AutoDisputeKind::NoCommunication))
            .chain(overdue.into_iter().map(|c| (c, AutoDisputeKind::DeadlineExceeded)));

        let mut created = Vec::new();
        for (candidate, kind) in candidates {
            match self.open_system_dispute(&candidate, kind).await {
                Ok(Some(dispute)) => {
                    tracing::info!(
                        "Auto-dispute {} opened on project {} ({})",
                        dispute.id,
                        candidate.project_id,
                        kind.reason()
                    );
                    created.push(dispute);
                }
                Ok(None) => {}
                Err(e) => tracing::error!(
                    "Auto-dispute for project {} ({}) failed: {}",
                    candidate.project_id,
                    kind.reason(),
                    e
                ),
            }
        }

        Ok(created)
    }

    async fn open_system_dispute(
        &self,
        candidate: &SweepCandidate,
        kind: AutoDisputeKind,
    ) -> Result<Option<Dispute>, ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let Some(project) = projectdb::lock_project(&mut tx, candidate.project_id).await? else {
            return Ok(None);
        };

        // Re-check under the lock: the other query or a participant may have
        // disputed this project since the candidate list was read.
        if project.status != ProjectStatus::InProgress
            || disputedb::has_active_dispute(&mut tx, project.id).await?
        {
            return Ok(None);
        }

        let dispute = disputedb::insert_dispute(
            &mut tx,
            project.id,
            project.client_id,
            kind.reason(),
            &kind.description(self.ghosting_days),
            true,
        )
        .await?;

        projectdb::set_project_status(&mut tx, project.id, ProjectStatus::Disputed).await?;

        let escrow = escrowdb::lock_escrow_by_project(&mut tx, project.id).await?;
        if let Some(escrow) = &escrow {
            if escrow.status == EscrowStatus::Funded {
                escrowdb::set_escrow_status(&mut tx, escrow.id, EscrowStatus::Disputed).await?;
            }
        }

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "dispute_opened",
                reference_id: dispute.id,
                reference_type: "dispute",
                amount: escrow.as_ref().map(|e| e.total_amount),
                from_status: escrow.as_ref().map(|e| e.status.to_str().to_string()),
                to_status: escrow
                    .as_ref()
                    .filter(|e| e.status == EscrowStatus::Funded)
                    .map(|_| EscrowStatus::Disputed.to_str().to_string()),
                actor_id: None,
                actor_type: ActorType::System,
                metadata: Some(serde_json::json!({ "project_id": project.id, "reason": kind.reason() })),
            },
        )
        .await;

        tx.commit().await?;
        Ok(Some(dispute))
    }
}
