// service/payout_service.rs
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        payoutdb::{self, PayoutExt},
        profiledb::ProfileExt,
    },
    models::{auditmodel::*, payoutmodel::*},
    service::{
        audit_service::{log_transaction_in_savepoint, AuditService},
        error::ServiceError,
    },
    utils::currency::format_idr,
};

/// Attempts at a serializable payout request before giving up.
const MAX_SERIALIZATION_ATTEMPTS: u32 = 5;

#[derive(Debug, Serialize, PartialEq)]
pub struct Balance {
    pub available: i64,
}

/// Rejects amounts outside `[min, max]` with a message naming the limit.
pub fn check_amount_band(amount: i64, min: i64, max: i64) -> Result<(), ServiceError> {
    if amount <= 0 {
        return Err(ServiceError::rule("Payout amount must be positive"));
    }
    if amount < min {
        return Err(ServiceError::rule(format!("Minimum payout amount is {}", format_idr(min))));
    }
    if amount > max {
        return Err(ServiceError::rule(format!("Maximum payout amount is {}", format_idr(max))));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PayoutService {
    db_client: Arc<DBClient>,
    audit_service: Arc<AuditService>,
    min_payout_amount: i64,
    max_payout_amount: i64,
}

impl PayoutService {
    pub fn new(
        db_client: Arc<DBClient>,
        audit_service: Arc<AuditService>,
        min_payout_amount: i64,
        max_payout_amount: i64,
    ) -> Self {
        Self {
            db_client,
            audit_service,
            min_payout_amount,
            max_payout_amount,
        }
    }

    /// Released earnings not yet claimed by a live payout, floored at zero.
    pub async fn get_available_balance(&self, freelancer_id: Uuid) -> Result<Balance, ServiceError> {
        let raw = self.db_client.get_balance(freelancer_id).await?;
        if raw < 0 {
            tracing::error!("Freelancer {} has negative balance {}", freelancer_id, raw);
        }
        Ok(Balance { available: raw.max(0) })
    }

    pub async fn list_payouts(&self, freelancer_id: Uuid) -> Result<Vec<Payout>, ServiceError> {
        Ok(self.db_client.get_freelancer_payouts(freelancer_id).await?)
    }

    /// Stores the destination account for future payouts. Existing payouts
    /// keep the snapshot they were created with.
    pub async fn update_bank_details(
        &self,
        freelancer_id: Uuid,
        bank: &BankDetails,
    ) -> Result<BankDetails, ServiceError> {
        if !bank.is_complete() {
            return Err(ServiceError::Validation(
                "Bank code, bank name, account number and holder name are all required".to_string(),
            ));
        }

        let profile = self.db_client.update_bank_details(freelancer_id, bank).await?;
        tracing::info!("Freelancer {} updated bank details", freelancer_id);
        Ok(profile.bank_details())
    }

    /// Withdraws `amount` from the freelancer's available balance.
    ///
    /// The balance is re-derived inside a SERIALIZABLE transaction, so two
    /// concurrent requests against the same balance cannot both commit. The
    /// loser is retried and then sees the winner's payout.
    pub async fn request_payout(&self, freelancer_id: Uuid, amount: i64) -> Result<Payout, ServiceError> {
        check_amount_band(amount, self.min_payout_amount, self.max_payout_amount)?;

        let bank = self
            .db_client
            .get_freelancer_profile(freelancer_id)
            .await?
            .map(|p| p.bank_details())
            .unwrap_or_default();

        if !bank.is_complete() {
            return Err(ServiceError::rule(
                "Please complete your bank details (bank, account number and holder name) before requesting a payout",
            ));
        }

        let mut attempt = 1;
        loop {
            match self.try_request_payout(freelancer_id, amount, &bank).await {
                Err(e) if e.is_serialization_failure() && attempt < MAX_SERIALIZATION_ATTEMPTS => {
                    tracing::warn!(
                        "Payout request for freelancer {} hit a serialization conflict (attempt {}), retrying",
                        freelancer_id,
                        attempt
                    );
                    tokio::time::sleep(Duration::from_millis(20 * u64::from(attempt))).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_request_payout(
        &self,
        freelancer_id: Uuid,
        amount: i64,
        bank: &BankDetails,
    ) -> Result<Payout, ServiceError> {
        let mut tx = self.db_client.begin_serializable().await?;

        let available = payoutdb::balance_in_tx(&mut tx, freelancer_id).await?;
        if available < amount {
            return Err(ServiceError::InsufficientBalance {
                requested: amount,
                available: available.max(0),
            });
        }

        let payout = payoutdb::insert_payout(&mut tx, freelancer_id, None, amount, bank).await?;

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "payout_requested",
                reference_id: payout.id,
                reference_type: "payout",
                amount: Some(amount),
                from_status: None,
                to_status: Some(PayoutStatus::Pending.to_str().to_string()),
                actor_id: Some(freelancer_id),
                actor_type: ActorType::User,
                metadata: Some(serde_json::json!({ "balance_before": available })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!("Payout {} of {} requested by freelancer {}", payout.id, amount, freelancer_id);
        Ok(payout)
    }

    pub async fn cancel_payout(&self, payout_id: Uuid, freelancer_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let payout = payoutdb::lock_payout(&mut tx, payout_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payout"))?;

        if payout.freelancer_id != freelancer_id {
            return Err(ServiceError::forbidden("You can only cancel your own payouts"));
        }

        if payout.status != PayoutStatus::Pending {
            return Err(ServiceError::rule("Only pending payouts can be cancelled"));
        }

        payoutdb::delete_payout(&mut tx, payout.id).await?;

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "payout_cancelled",
                reference_id: payout.id,
                reference_type: "payout",
                amount: Some(payout.amount),
                from_status: Some(PayoutStatus::Pending.to_str().to_string()),
                to_status: None,
                actor_id: Some(freelancer_id),
                actor_type: ActorType::User,
                metadata: payout.escrow_id.map(|id| serde_json::json!({ "escrow_id": id })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!("Payout {} cancelled by freelancer {}", payout.id, freelancer_id);
        Ok(())
    }

    pub async fn process_payout(&self, admin_id: Uuid, payout_id: Uuid) -> Result<Payout, ServiceError> {
        self.transition(admin_id, payout_id, PayoutStatus::Processing, None)
            .await
    }

    pub async fn complete_payout(&self, admin_id: Uuid, payout_id: Uuid) -> Result<Payout, ServiceError> {
        self.transition(admin_id, payout_id, PayoutStatus::Completed, None)
            .await
    }

    pub async fn fail_payout(&self, admin_id: Uuid, payout_id: Uuid, reason: &str) -> Result<Payout, ServiceError> {
        self.transition(admin_id, payout_id, PayoutStatus::Failed, Some(reason))
            .await
    }

    async fn transition(
        &self,
        admin_id: Uuid,
        payout_id: Uuid,
        to: PayoutStatus,
        failure_reason: Option<&str>,
    ) -> Result<Payout, ServiceError> {
        let mut tx = self.db_client.begin().await?;

        let payout = payoutdb::lock_payout(&mut tx, payout_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payout"))?;

        if !payout.status.can_transition_to(to) {
            return Err(ServiceError::rule(match to {
                PayoutStatus::Processing => "Only pending payouts can be processed",
                PayoutStatus::Completed => "Only processing payouts can be completed",
                PayoutStatus::Failed => "Only pending or processing payouts can be marked failed",
                PayoutStatus::Pending => "Payouts cannot return to pending",
            }));
        }

        let updated = payoutdb::update_payout_status(&mut tx, payout.id, to, failure_reason).await?;
        tx.commit().await?;

        tracing::info!(
            "Payout {} moved {} -> {} by admin {}",
            payout.id,
            payout.status.to_str(),
            to.to_str(),
            admin_id
        );

        let action = match to {
            PayoutStatus::Processing => "process_payout",
            PayoutStatus::Completed => "complete_payout",
            _ => "fail_payout",
        };

        self.audit_service
            .try_log_admin_action(
                admin_id,
                action,
                "payout",
                payout.id,
                Some(serde_json::json!({
                    "amount": payout.amount,
                    "freelancer_id": payout.freelancer_id,
                    "reason": failure_reason,
                })),
            )
            .await;

        self.audit_service
            .try_log_transaction(&NewTransactionLog {
                log_type: match to {
                    PayoutStatus::Processing => "payout_processing",
                    PayoutStatus::Completed => "payout_completed",
                    _ => "payout_failed",
                },
                reference_id: payout.id,
                reference_type: "payout",
                amount: Some(payout.amount),
                from_status: Some(payout.status.to_str().to_string()),
                to_status: Some(to.to_str().to_string()),
                actor_id: Some(admin_id),
                actor_type: ActorType::Admin,
                metadata: failure_reason.map(|r| serde_json::json!({ "reason": r })),
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_band() {
        assert!(check_amount_band(50_000, 50_000, 100_000_000).is_ok());
        assert!(check_amount_band(100_000_000, 50_000, 100_000_000).is_ok());

        let err = check_amount_band(49_999, 50_000, 100_000_000).unwrap_err();
        assert_eq!(err.to_string(), "Minimum payout amount is Rp 50.000");

        let err = check_amount_band(100_000_001, 50_000, 100_000_000).unwrap_err();
        assert_eq!(err.to_string(), "Maximum payout amount is Rp 100.000.000");

        for amount in [0, -1] {
            let err = check_amount_band(amount, 0, 100).unwrap_err();
            assert_eq!(err.to_string(), "Payout amount must be positive");
        }
    }
}
