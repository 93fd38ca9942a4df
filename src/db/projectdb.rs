// db/projectdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::projectmodel::*;

#[async_trait]
pub trait ProjectExt {
    async fn create_project(
        &self,
        client_id: Uuid,
        title: &str,
        description: &str,
        budget: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Project, Error>;

    async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>, Error>;

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, Error>;

    async fn get_accepted_bid(&self, project_id: Uuid) -> Result<Option<Bid>, Error>;

    async fn get_review_for_project(&self, project_id: Uuid) -> Result<Option<Review>, Error>;

    async fn create_review(
        &self,
        project_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i32,
        comment: &str,
    ) -> Result<Review, Error>;
}

#[async_trait]
impl ProjectExt for DBClient {
    async fn create_project(
        &self,
        client_id: Uuid,
        title: &str,
        description: &str,
        budget: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (client_id, title, description, budget, deadline)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(title)
        .bind(description)
        .bind(budget)
        .bind(deadline)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>, Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, Error> {
        sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1")
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_accepted_bid(&self, project_id: Uuid) -> Result<Option<Bid>, Error> {
        sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids WHERE project_id = $1 AND status = 'accepted'",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_review_for_project(&self, project_id: Uuid) -> Result<Option<Review>, Error> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_review(
        &self,
        project_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i32,
        comment: &str,
    ) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (project_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(reviewer_id)
        .bind(reviewee_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }
}

pub async fn count_bids_since(
    tx: &mut PgTx<'_>,
    freelancer_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bids WHERE freelancer_id = $1 AND created_at >= $2",
    )
    .bind(freelancer_id)
    .bind(since)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_bid(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    freelancer_id: Uuid,
    amount: i64,
    proposal: &str,
) -> Result<Bid, Error> {
    sqlx::query_as::<_, Bid>(
        r#"
        INSERT INTO bids (project_id, freelancer_id, amount, proposal)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(freelancer_id)
    .bind(amount)
    .bind(proposal)
    .fetch_one(&mut **tx)
    .await
}

pub async fn lock_project(tx: &mut PgTx<'_>, project_id: Uuid) -> Result<Option<Project>, Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 FOR UPDATE")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await
}

/// Reads the status without taking the row lock, for callers that already
/// hold a lock further down the dispute -> project -> escrow order.
pub async fn project_status(tx: &mut PgTx<'_>, project_id: Uuid) -> Result<Option<ProjectStatus>, Error> {
    sqlx::query_scalar::<_, ProjectStatus>("SELECT status FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn set_project_status(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    status: ProjectStatus,
) -> Result<(), Error> {
    sqlx::query("UPDATE projects SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn assign_freelancer(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    freelancer_id: Uuid,
) -> Result<Project, Error> {
    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET freelancer_id = $1, status = 'in_progress', updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(freelancer_id)
    .bind(project_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn lock_bid(tx: &mut PgTx<'_>, bid_id: Uuid) -> Result<Option<Bid>, Error> {
    sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1 FOR UPDATE")
        .bind(bid_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn set_bid_status(tx: &mut PgTx<'_>, bid_id: Uuid, status: BidStatus) -> Result<Bid, Error> {
    sqlx::query_as::<_, Bid>("UPDATE bids SET status = $1 WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(bid_id)
        .fetch_one(&mut **tx)
        .await
}

/// Rejects every other pending bid on the project. Returns how many were touched.
pub async fn reject_competing_bids(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    accepted_bid_id: Uuid,
) -> Result<u64, Error> {
    let result = sqlx::query(
        r#"
        UPDATE bids SET status = 'rejected'
        WHERE project_id = $1 AND id <> $2 AND status = 'pending'
        "#,
    )
    .bind(project_id)
    .bind(accepted_bid_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes the project; bids, escrow, disputes, chat and review cascade.
pub async fn delete_project(tx: &mut PgTx<'_>, project_id: Uuid) -> Result<u64, Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}
