// service/audit_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::db::{DBClient, PgTx},
    models::auditmodel::*,
    service::error::ServiceError,
};

/// Append-only writer for `transaction_logs` and `admin_actions`.
///
/// The `try_*` variants swallow failures after logging them: an audit write
/// must never turn a completed money movement into an error.
#[derive(Debug, Clone)]
pub struct AuditService {
    db_client: Arc<DBClient>,
}

impl AuditService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn log_transaction(&self, entry: &NewTransactionLog) -> Result<(), ServiceError> {
        let mut tx = self.db_client.begin().await?;
        insert_transaction_log(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn log_admin_action(
        &self,
        admin_id: Uuid,
        action: &str,
        target_type: &str,
        target_id: Uuid,
        details: Option<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO admin_actions (admin_id, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(admin_id)
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(details)
        .execute(&self.db_client.pool)
        .await?;

        Ok(())
    }

    pub async fn try_log_transaction(&self, entry: &NewTransactionLog) {
        if let Err(e) = self.log_transaction(entry).await {
            tracing::error!(
                "Failed to write {} log for {} {}: {}",
                entry.log_type,
                entry.reference_type,
                entry.reference_id,
                e
            );
        }
    }

    pub async fn try_log_admin_action(
        &self,
        admin_id: Uuid,
        action: &str,
        target_type: &str,
        target_id: Uuid,
        details: Option<serde_json::Value>,
    ) {
        if let Err(e) = self
            .log_admin_action(admin_id, action, target_type, target_id, details)
            .await
        {
            tracing::error!(
                "Failed to record admin action {} on {} {} by {}: {}",
                action,
                target_type,
                target_id,
                admin_id,
                e
            );
        }
    }

    pub async fn get_transaction_logs(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<TransactionLog>, ServiceError> {
        let logs = sqlx::query_as::<_, TransactionLog>(
            "SELECT * FROM transaction_logs WHERE reference_id = $1 ORDER BY created_at",
        )
        .bind(reference_id)
        .fetch_all(&self.db_client.pool)
        .await?;

        Ok(logs)
    }

    pub async fn get_admin_actions(&self, target_id: Uuid) -> Result<Vec<AdminAction>, ServiceError> {
        let actions = sqlx::query_as::<_, AdminAction>(
            "SELECT * FROM admin_actions WHERE target_id = $1 ORDER BY created_at",
        )
        .bind(target_id)
        .fetch_all(&self.db_client.pool)
        .await?;

        Ok(actions)
    }
}

pub async fn insert_transaction_log(
    tx: &mut PgTx<'_>,
    entry: &NewTransactionLog,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transaction_logs (
            log_type, reference_id, reference_type, amount,
            from_status, to_status, actor_id, actor_type, metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.log_type)
    .bind(entry.reference_id)
    .bind(entry.reference_type)
    .bind(entry.amount)
    .bind(&entry.from_status)
    .bind(&entry.to_status)
    .bind(entry.actor_id)
    .bind(entry.actor_type.to_str())
    .bind(&entry.metadata)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Writes the log inside a savepoint of `tx`. A failed insert rolls back to the
/// savepoint only, so the surrounding transaction can still commit.
pub async fn log_transaction_in_savepoint(tx: &mut PgTx<'_>, entry: &NewTransactionLog) {
    let result: Result<(), sqlx::Error> = async {
        let mut savepoint = sqlx::Connection::begin(&mut **tx).await?;
        insert_transaction_log(&mut savepoint, entry).await?;
        savepoint.commit().await
    }
    .await;

    if let Err(e) = result {
        tracing::error!(
            "Failed to write {} log for {} {}: {}",
            entry.log_type,
            entry.reference_type,
            entry.reference_id,
            e
        );
    }
}
