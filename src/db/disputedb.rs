// db/disputedb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::disputemodel::*;

#[async_trait]
pub trait DisputeExt {
    async fn get_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error>;

    async fn get_active_dispute(&self, project_id: Uuid) -> Result<Option<Dispute>, Error>;

    async fn get_project_disputes(&self, project_id: Uuid) -> Result<Vec<Dispute>, Error>;

    /// In-progress projects whose escrow has been funded for at least
    /// `ghosting_days` with no message in that window and no active dispute.
    async fn find_ghosted_projects(&self, ghosting_days: i64) -> Result<Vec<SweepCandidate>, Error>;

    /// In-progress projects past their deadline with no active dispute.
    async fn find_overdue_projects(&self) -> Result<Vec<SweepCandidate>, Error>;
}

#[async_trait]
impl DisputeExt for DBClient {
    async fn get_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1")
            .bind(dispute_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_active_dispute(&self, project_id: Uuid) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(
            r#"
            SELECT * FROM disputes
            WHERE project_id = $1 AND status IN ('open', 'under_review')
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_project_disputes(&self, project_id: Uuid) -> Result<Vec<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(
            "SELECT * FROM disputes WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_ghosted_projects(&self, ghosting_days: i64) -> Result<Vec<SweepCandidate>, Error> {
        sqlx::query_as::<_, SweepCandidate>(
            r#"
            SELECT p.id AS project_id, p.client_id
            FROM projects p
            JOIN escrows e ON e.project_id = p.id
            LEFT JOIN conversations c ON c.project_id = p.id
            WHERE p.status = 'in_progress'
              AND e.status = 'funded'
              AND e.funded_at <= NOW() - make_interval(days => $1::int)
              AND NOT EXISTS (
                  SELECT 1 FROM messages m
                  WHERE m.conversation_id = c.id
                    AND m.created_at >= NOW() - make_interval(days => $1::int)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM disputes d
                  WHERE d.project_id = p.id AND d.status IN ('open', 'under_review')
              )
            ORDER BY e.funded_at
            "#,
        )
        .bind(ghosting_days)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_overdue_projects(&self) -> Result<Vec<SweepCandidate>, Error> {
        sqlx::query_as::<_, SweepCandidate>(
            r#"
            SELECT p.id AS project_id, p.client_id
            FROM projects p
            WHERE p.status = 'in_progress'
              AND p.deadline IS NOT NULL
              AND p.deadline < NOW()
              AND NOT EXISTS (
                  SELECT 1 FROM disputes d
                  WHERE d.project_id = p.id AND d.status IN ('open', 'under_review')
              )
            ORDER BY p.deadline
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

pub async fn has_active_dispute(tx: &mut PgTx<'_>, project_id: Uuid) -> Result<bool, Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM disputes
            WHERE project_id = $1 AND status IN ('open', 'under_review')
        )
        "#,
    )
    .bind(project_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_dispute(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    initiator_id: Uuid,
    reason: &str,
    description: &str,
    is_system_generated: bool,
) -> Result<Dispute, Error> {
    sqlx::query_as::<_, Dispute>(
        r#"
        INSERT INTO disputes (project_id, initiator_id, reason, description, is_system_generated)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(initiator_id)
    .bind(reason)
    .bind(description)
    .bind(is_system_generated)
    .fetch_one(&mut **tx)
    .await
}

pub async fn lock_dispute(tx: &mut PgTx<'_>, dispute_id: Uuid) -> Result<Option<Dispute>, Error> {
    sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1 FOR UPDATE")
        .bind(dispute_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn mark_dispute_resolved(
    tx: &mut PgTx<'_>,
    dispute_id: Uuid,
    resolution: &str,
    outcome: DisputeOutcome,
    admin_id: Uuid,
) -> Result<Dispute, Error> {
    sqlx::query_as::<_, Dispute>(
        r#"
        UPDATE disputes
        SET status = 'resolved', resolution = $1, outcome = $2,
            resolved_by = $3, resolved_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(resolution)
    .bind(outcome)
    .bind(admin_id)
    .bind(dispute_id)
    .fetch_one(&mut **tx)
    .await
}
