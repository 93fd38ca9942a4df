// db/payoutdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::payoutmodel::*;

/// Released escrow earnings minus every payout still holding funds.
const BALANCE_QUERY: &str = r#"
    SELECT (
        (SELECT COALESCE(SUM(freelancer_amount), 0)
         FROM escrows
         WHERE freelancer_id = $1 AND status = 'released')
      - (SELECT COALESCE(SUM(amount), 0)
         FROM payouts
         WHERE freelancer_id = $1 AND status IN ('pending', 'processing', 'completed'))
    )::BIGINT
"#;

#[async_trait]
pub trait PayoutExt {
    async fn get_freelancer_payouts(&self, freelancer_id: Uuid) -> Result<Vec<Payout>, Error>;

    async fn get_payouts_for_escrow(&self, escrow_id: Uuid) -> Result<Vec<Payout>, Error>;

    /// Raw balance; may be negative only if the ledger is already inconsistent.
    async fn get_balance(&self, freelancer_id: Uuid) -> Result<i64, Error>;
}

#[async_trait]
impl PayoutExt for DBClient {
    async fn get_freelancer_payouts(&self, freelancer_id: Uuid) -> Result<Vec<Payout>, Error> {
        sqlx::query_as::<_, Payout>(
            "SELECT * FROM payouts WHERE freelancer_id = $1 ORDER BY created_at DESC",
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_payouts_for_escrow(&self, escrow_id: Uuid) -> Result<Vec<Payout>, Error> {
        sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE escrow_id = $1")
            .bind(escrow_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_balance(&self, freelancer_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(BALANCE_QUERY)
            .bind(freelancer_id)
            .fetch_one(&self.pool)
            .await
    }
}

pub async fn balance_in_tx(tx: &mut PgTx<'_>, freelancer_id: Uuid) -> Result<i64, Error> {
    sqlx::query_scalar::<_, i64>(BALANCE_QUERY)
        .bind(freelancer_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn insert_payout(
    tx: &mut PgTx<'_>,
    freelancer_id: Uuid,
    escrow_id: Option<Uuid>,
    amount: i64,
    bank: &BankDetails,
) -> Result<Payout, Error> {
    sqlx::query_as::<_, Payout>(
        r#"
        INSERT INTO payouts (
            freelancer_id, escrow_id, amount, status,
            bank_code, bank_name, account_number, account_holder_name
        )
        VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(freelancer_id)
    .bind(escrow_id)
    .bind(amount)
    .bind(&bank.bank_code)
    .bind(&bank.bank_name)
    .bind(&bank.account_number)
    .bind(&bank.account_holder_name)
    .fetch_one(&mut **tx)
    .await
}

pub async fn lock_payout(tx: &mut PgTx<'_>, payout_id: Uuid) -> Result<Option<Payout>, Error> {
    sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1 FOR UPDATE")
        .bind(payout_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn delete_payout(tx: &mut PgTx<'_>, payout_id: Uuid) -> Result<(), Error> {
    sqlx::query("DELETE FROM payouts WHERE id = $1")
        .bind(payout_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn update_payout_status(
    tx: &mut PgTx<'_>,
    payout_id: Uuid,
    status: PayoutStatus,
    failure_reason: Option<&str>,
) -> Result<Payout, Error> {
    sqlx::query_as::<_, Payout>(
        r#"
        UPDATE payouts
        SET status = $1,
            failure_reason = COALESCE($2, failure_reason),
            processed_at = CASE WHEN $1 = 'processing'::payout_status THEN NOW() ELSE processed_at END,
            completed_at = CASE WHEN $1 = 'completed'::payout_status THEN NOW() ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(failure_reason)
    .bind(payout_id)
    .fetch_one(&mut **tx)
    .await
}
