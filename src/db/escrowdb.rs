// db/escrowdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::escrowmodel::*;

#[async_trait]
pub trait EscrowExt {
    async fn get_escrow(&self, escrow_id: Uuid) -> Result<Option<Escrow>, Error>;

    async fn get_escrow_by_project(&self, project_id: Uuid) -> Result<Option<Escrow>, Error>;

    /// Swaps in a fresh checkout, only while the escrow is still pending.
    async fn replace_checkout(
        &self,
        escrow_id: Uuid,
        gateway_order_id: &str,
        session_token: &str,
    ) -> Result<Option<Escrow>, Error>;

    async fn get_earnings(&self, freelancer_id: Uuid) -> Result<Earnings, Error>;
}

#[async_trait]
impl EscrowExt for DBClient {
    async fn get_escrow(&self, escrow_id: Uuid) -> Result<Option<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>("SELECT * FROM escrows WHERE id = $1")
            .bind(escrow_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_escrow_by_project(&self, project_id: Uuid) -> Result<Option<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>("SELECT * FROM escrows WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn replace_checkout(
        &self,
        escrow_id: Uuid,
        gateway_order_id: &str,
        session_token: &str,
    ) -> Result<Option<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>(
            r#"
            UPDATE escrows
            SET gateway_order_id = $1, session_token = $2, updated_at = NOW()
            WHERE id = $3 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(gateway_order_id)
        .bind(session_token)
        .bind(escrow_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_earnings(&self, freelancer_id: Uuid) -> Result<Earnings, Error> {
        let (total_earned, in_escrow, this_month) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(freelancer_amount) FILTER (WHERE status = 'released'), 0)::BIGINT,
                COALESCE(SUM(freelancer_amount) FILTER (WHERE status = 'funded'), 0)::BIGINT,
                COALESCE(SUM(freelancer_amount) FILTER (
                    WHERE status = 'released' AND released_at >= date_trunc('month', NOW())
                ), 0)::BIGINT
            FROM escrows
            WHERE freelancer_id = $1
            "#,
        )
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Earnings {
            total_earned,
            in_escrow,
            this_month,
        })
    }
}

pub async fn insert_escrow(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    client_id: Uuid,
    freelancer_id: Uuid,
    amounts: EscrowAmounts,
    gateway_order_id: &str,
    session_token: &str,
) -> Result<Escrow, Error> {
    sqlx::query_as::<_, Escrow>(
        r#"
        INSERT INTO escrows (
            project_id, client_id, freelancer_id,
            total_amount, platform_fee, freelancer_amount,
            status, gateway_order_id, session_token
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(client_id)
    .bind(freelancer_id)
    .bind(amounts.total_amount)
    .bind(amounts.platform_fee)
    .bind(amounts.freelancer_amount)
    .bind(gateway_order_id)
    .bind(session_token)
    .fetch_one(&mut **tx)
    .await
}

pub async fn lock_escrow(tx: &mut PgTx<'_>, escrow_id: Uuid) -> Result<Option<Escrow>, Error> {
    sqlx::query_as::<_, Escrow>("SELECT * FROM escrows WHERE id = $1 FOR UPDATE")
        .bind(escrow_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn lock_escrow_by_project(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
) -> Result<Option<Escrow>, Error> {
    sqlx::query_as::<_, Escrow>("SELECT * FROM escrows WHERE project_id = $1 FOR UPDATE")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn lock_escrow_by_order_id(
    tx: &mut PgTx<'_>,
    gateway_order_id: &str,
) -> Result<Option<Escrow>, Error> {
    sqlx::query_as::<_, Escrow>("SELECT * FROM escrows WHERE gateway_order_id = $1 FOR UPDATE")
        .bind(gateway_order_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn set_escrow_status(
    tx: &mut PgTx<'_>,
    escrow_id: Uuid,
    status: EscrowStatus,
) -> Result<(), Error> {
    sqlx::query("UPDATE escrows SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(escrow_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_escrow_funded(tx: &mut PgTx<'_>, escrow_id: Uuid) -> Result<Escrow, Error> {
    sqlx::query_as::<_, Escrow>(
        r#"
        UPDATE escrows
        SET status = 'funded', funded_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(escrow_id)
    .fetch_one(&mut **tx)
    .await
}

/// Stamps `funded_at` without touching the status (payment landed on a disputed escrow).
pub async fn record_funding(tx: &mut PgTx<'_>, escrow_id: Uuid) -> Result<Escrow, Error> {
    sqlx::query_as::<_, Escrow>(
        r#"
        UPDATE escrows
        SET funded_at = COALESCE(funded_at, NOW()), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(escrow_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn mark_escrow_released(tx: &mut PgTx<'_>, escrow_id: Uuid) -> Result<Escrow, Error> {
    sqlx::query_as::<_, Escrow>(
        r#"
        UPDATE escrows
        SET status = 'released', released_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(escrow_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn clear_session_token(tx: &mut PgTx<'_>, escrow_id: Uuid) -> Result<(), Error> {
    sqlx::query("UPDATE escrows SET session_token = NULL, updated_at = NOW() WHERE id = $1")
        .bind(escrow_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
