// service/escrow_service.rs
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    db::{
        chatdb,
        db::{DBClient, PgTx},
        escrowdb::{self, EscrowExt},
        payoutdb,
        profiledb::ProfileExt,
        projectdb::{self, ProjectExt},
        userdb::UserExt,
    },
    models::{auditmodel::*, escrowmodel::*, payoutmodel::*, projectmodel::*},
    service::{
        audit_service::{log_transaction_in_savepoint, AuditService},
        error::ServiceError,
        payment_gateway::{
            is_payment_expired_or_cancelled, is_payment_success, PaymentGateway,
            PaymentNotification,
        },
        tier_service::TierService,
    },
};

const ORDER_ID_PREFIX: &str = "esc";

static ORDER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^esc-[0-9a-f]{12}-[0-9]+$").unwrap_or_else(|e| panic!("invalid order id pattern: {e}"))
});

/// `esc-<12 hex of sha256(project id ‖ millis)>-<millis>`, well inside the
/// gateway's 50 character order id limit.
pub fn generate_order_id(project_id: Uuid, unix_millis: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_id.to_string().as_bytes());
    hasher.update(unix_millis.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}-{}", ORDER_ID_PREFIX, &digest[..12], unix_millis)
}

pub fn is_escrow_order_id(order_id: &str) -> bool {
    ORDER_ID_PATTERN.is_match(order_id)
}

/// Parses a gateway amount such as `"150000.00"`. Amounts with a non-zero
/// fractional part are rejected since IDR has no minor unit.
pub fn parse_gross_amount(raw: &str) -> Option<i64> {
    let (whole, fraction) = raw.trim().split_once('.').unwrap_or((raw.trim(), ""));
    if !fraction.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<i64>().ok()
}

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub escrow: Escrow,
    pub session_token: String,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PaymentStatusCheck {
    pub status: EscrowStatus,
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResult {
    pub escrow: Escrow,
    pub payout: Payout,
}

/// What a webhook delivery did. Only `Funded` and `CheckoutExpired` mutate state.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Funded(Uuid),
    CheckoutExpired(Uuid),
    AlreadyProcessed(Uuid),
    Ignored(String),
    Discarded(String),
}

#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
    tier_service: Arc<TierService>,
    audit_service: Arc<AuditService>,
    platform_fee_percent: f64,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<dyn PaymentGateway>,
        tier_service: Arc<TierService>,
        audit_service: Arc<AuditService>,
        platform_fee_percent: f64,
    ) -> Self {
        Self {
            db_client,
            gateway,
            tier_service,
            audit_service,
            platform_fee_percent,
        }
    }

    /// Opens a checkout for the accepted bid. The project is re-checked under
    /// its row lock before the escrow row is written, so a dispute or
    /// cancellation that lands during the gateway call wins.
    pub async fn create(&self, project_id: Uuid, client_id: Uuid) -> Result<CheckoutSession, ServiceError> {
        let project = self
            .db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        check_fundable(&project, client_id)?;

        if self.db_client.get_escrow_by_project(project_id).await?.is_some() {
            return Err(ServiceError::Conflict("Escrow already exists for this project".to_string()));
        }

        let bid = self
            .db_client
            .get_accepted_bid(project_id)
            .await?
            .ok_or_else(|| ServiceError::rule("Project has no accepted bid"))?;

        let client = self
            .db_client
            .get_user(client_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let amounts = EscrowAmounts::from_total(bid.amount, self.platform_fee_percent);
        let order_id = generate_order_id(project_id, Utc::now().timestamp_millis());

        let session = self
            .gateway
            .create_transaction(&order_id, amounts.total_amount, &client.email, &project.title)
            .await?;

        let mut tx = self.db_client.begin().await?;

        let project = projectdb::lock_project(&mut tx, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        check_fundable(&project, client_id)?;

        if escrowdb::lock_escrow_by_project(&mut tx, project_id).await?.is_some() {
            return Err(ServiceError::Conflict("Escrow already exists for this project".to_string()));
        }

        let escrow = escrowdb::insert_escrow(
            &mut tx,
            project_id,
            client_id,
            bid.freelancer_id,
            amounts,
            &order_id,
            &session.session_token,
        )
        .await
        .map_err(|e| ServiceError::conflict_on_duplicate(e, "Escrow already exists for this project"))?;

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "escrow_created",
                reference_id: escrow.id,
                reference_type: "escrow",
                amount: Some(escrow.total_amount),
                from_status: None,
                to_status: Some(EscrowStatus::Pending.to_str().to_string()),
                actor_id: Some(client_id),
                actor_type: ActorType::User,
                metadata: Some(serde_json::json!({ "order_id": order_id })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!(
            "Escrow {} created for project {}: total {} (fee {}, freelancer {}), order {}",
            escrow.id,
            project_id,
            amounts.total_amount,
            amounts.platform_fee,
            amounts.freelancer_amount,
            order_id
        );

        Ok(CheckoutSession {
            escrow,
            session_token: session.session_token,
            redirect_url: session.redirect_url,
        })
    }

    /// Issues a fresh checkout for a pending escrow whose previous session lapsed.
    pub async fn retry_payment(&self, escrow_id: Uuid, client_id: Uuid) -> Result<CheckoutSession, ServiceError> {
        let escrow = self
            .db_client
            .get_escrow(escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;

        if escrow.client_id != client_id {
            return Err(ServiceError::forbidden("Only the client can retry this payment"));
        }

        if escrow.status != EscrowStatus::Pending {
            return Err(ServiceError::rule("Only pending escrows can retry payment"));
        }

        // The previous checkout may have been paid without us hearing about it.
        if let Some(order_id) = escrow.gateway_order_id.as_deref() {
            let status = self.gateway.get_transaction_status(order_id).await?;
            if is_payment_success(&status.transaction_status, status.fraud_status.as_deref()) {
                self.confirm_payment(escrow.id, "poll").await?;
                return Err(ServiceError::Conflict("Payment has already been completed".to_string()));
            }
        }

        let project = self
            .db_client
            .get_project(escrow.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        let client = self
            .db_client
            .get_user(client_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let order_id = generate_order_id(escrow.project_id, Utc::now().timestamp_millis());
        let session = self
            .gateway
            .create_transaction(&order_id, escrow.total_amount, &client.email, &project.title)
            .await?;

        let escrow = self
            .db_client
            .replace_checkout(escrow.id, &order_id, &session.session_token)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Escrow is no longer pending".to_string()))?;

        tracing::info!("Escrow {} issued new checkout with order {}", escrow.id, order_id);

        self.audit_service
            .try_log_transaction(&NewTransactionLog {
                log_type: "escrow_checkout_renewed",
                reference_id: escrow.id,
                reference_type: "escrow",
                amount: Some(escrow.total_amount),
                from_status: None,
                to_status: None,
                actor_id: Some(client_id),
                actor_type: ActorType::User,
                metadata: Some(serde_json::json!({ "order_id": order_id })),
            })
            .await;

        Ok(CheckoutSession {
            escrow,
            session_token: session.session_token,
            redirect_url: session.redirect_url,
        })
    }

    /// Applies a gateway notification. Invalid input is discarded, never
    /// returned as an error, so the gateway does not keep redelivering it.
    pub async fn handle_webhook(&self, notification: &PaymentNotification) -> Result<WebhookOutcome, ServiceError> {
        let Some(order_id) = notification.order_id.as_deref() else {
            tracing::warn!("Discarding payment notification without order_id");
            return Ok(WebhookOutcome::Discarded("missing order_id".to_string()));
        };

        if !is_escrow_order_id(order_id) {
            tracing::warn!("Discarding payment notification for foreign order id {}", order_id);
            return Ok(WebhookOutcome::Discarded("unrecognised order id".to_string()));
        }

        if !self.gateway.verify_signature(notification) {
            tracing::warn!("Discarding payment notification with invalid signature for order {}", order_id);
            return Ok(WebhookOutcome::Discarded("invalid signature".to_string()));
        }

        let Some(transaction_status) = notification.transaction_status.as_deref() else {
            tracing::warn!("Discarding payment notification without transaction_status for order {}", order_id);
            return Ok(WebhookOutcome::Discarded("missing transaction_status".to_string()));
        };

        let mut tx = self.db_client.begin().await?;

        let Some(escrow) = escrowdb::lock_escrow_by_order_id(&mut tx, order_id).await? else {
            tracing::warn!("Discarding payment notification for unknown order {}", order_id);
            return Ok(WebhookOutcome::Discarded("unknown order".to_string()));
        };

        if is_payment_success(transaction_status, notification.fraud_status.as_deref()) {
            let paid = notification.gross_amount.as_deref().and_then(parse_gross_amount);
            if paid != Some(escrow.total_amount) {
                tracing::warn!(
                    "Discarding payment notification for escrow {}: gross_amount {:?} does not match total {}",
                    escrow.id,
                    notification.gross_amount,
                    escrow.total_amount
                );
                return Ok(WebhookOutcome::Discarded("gross amount mismatch".to_string()));
            }

            let applied = apply_payment_success(&mut tx, &escrow, "webhook").await?;
            tx.commit().await?;

            return Ok(if applied.is_some() {
                tracing::info!("Escrow {} funded via webhook (order {})", escrow.id, order_id);
                WebhookOutcome::Funded(escrow.id)
            } else {
                tracing::debug!("Duplicate success notification for escrow {}", escrow.id);
                WebhookOutcome::AlreadyProcessed(escrow.id)
            });
        }

        if is_payment_expired_or_cancelled(transaction_status) {
            if escrow.status != EscrowStatus::Pending {
                return Ok(WebhookOutcome::Ignored(format!(
                    "{} for escrow in status {}",
                    transaction_status,
                    escrow.status.to_str()
                )));
            }

            escrowdb::clear_session_token(&mut tx, escrow.id).await?;
            tx.commit().await?;

            tracing::info!(
                "Checkout for escrow {} ended with {}; escrow stays pending",
                escrow.id,
                transaction_status
            );
            return Ok(WebhookOutcome::CheckoutExpired(escrow.id));
        }

        tracing::debug!("Ignoring {} notification for escrow {}", transaction_status, escrow.id);
        Ok(WebhookOutcome::Ignored(transaction_status.to_string()))
    }

    /// Polling fallback for a missed webhook. Safe to call repeatedly.
    pub async fn check_payment_status(&self, escrow_id: Uuid, user_id: Uuid) -> Result<PaymentStatusCheck, ServiceError> {
        let escrow = self
            .db_client
            .get_escrow(escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;

        if !escrow.is_participant(user_id) {
            return Err(ServiceError::forbidden("You are not a party to this escrow"));
        }

        if escrow.status != EscrowStatus::Pending {
            return Ok(PaymentStatusCheck {
                status: escrow.status,
                updated: false,
            });
        }

        let order_id = escrow
            .gateway_order_id
            .as_deref()
            .ok_or_else(|| ServiceError::rule("Escrow has no payment session"))?;

        let status = self.gateway.get_transaction_status(order_id).await?;

        if is_payment_success(&status.transaction_status, status.fraud_status.as_deref()) {
            return self.confirm_payment(escrow.id, "poll").await;
        }

        if is_payment_expired_or_cancelled(&status.transaction_status) {
            let mut tx = self.db_client.begin().await?;
            if let Some(locked) = escrowdb::lock_escrow(&mut tx, escrow.id).await? {
                if locked.status == EscrowStatus::Pending {
                    escrowdb::clear_session_token(&mut tx, locked.id).await?;
                }
            }
            tx.commit().await?;
        }

        Ok(PaymentStatusCheck {
            status: EscrowStatus::Pending,
            updated: false,
        })
    }

    async fn confirm_payment(&self, escrow_id: Uuid, source: &str) -> Result<PaymentStatusCheck, ServiceError> {
        let mut tx = self.db_client.begin().await?;
        let escrow = escrowdb::lock_escrow(&mut tx, escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;

        let applied = apply_payment_success(&mut tx, &escrow, source).await?;
        let updated = applied.is_some();
        let status = applied.unwrap_or(escrow.status);
        tx.commit().await?;

        if updated {
            tracing::info!("Escrow {} funded via {}", escrow_id, source);
        }

        Ok(PaymentStatusCheck { status, updated })
    }

    pub async fn release(&self, escrow_id: Uuid, client_id: Uuid) -> Result<ReleaseResult, ServiceError> {
        let snapshot = self
            .db_client
            .get_escrow(escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;

        if snapshot.client_id != client_id {
            return Err(ServiceError::forbidden("Only the client can release this escrow"));
        }

        let bank = self
            .db_client
            .get_freelancer_profile(snapshot.freelancer_id)
            .await?
            .map(|p| p.bank_details())
            .unwrap_or_default();

        let mut tx = self.db_client.begin().await?;

        // Project before escrow, the same order disputes lock in.
        let project = projectdb::lock_project(&mut tx, snapshot.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        let escrow = escrowdb::lock_escrow(&mut tx, escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;

        if escrow.status != EscrowStatus::Funded {
            return Err(ServiceError::rule("Escrow is not funded"));
        }

        if !project.status.is_releasable() {
            return Err(ServiceError::rule("Project has not been delivered yet"));
        }

        let payout = payoutdb::insert_payout(
            &mut tx,
            escrow.freelancer_id,
            Some(escrow.id),
            escrow.freelancer_amount,
            &bank,
        )
        .await?;
        let released = escrowdb::mark_escrow_released(&mut tx, escrow.id).await?;
        projectdb::set_project_status(&mut tx, project.id, ProjectStatus::Completed).await?;

        log_transaction_in_savepoint(
            &mut tx,
            &NewTransactionLog {
                log_type: "escrow_released",
                reference_id: escrow.id,
                reference_type: "escrow",
                amount: Some(escrow.freelancer_amount),
                from_status: Some(EscrowStatus::Funded.to_str().to_string()),
                to_status: Some(EscrowStatus::Released.to_str().to_string()),
                actor_id: Some(client_id),
                actor_type: ActorType::User,
                metadata: Some(serde_json::json!({ "payout_id": payout.id })),
            },
        )
        .await;

        tx.commit().await?;

        tracing::info!(
            "Escrow {} released: payout {} of {} created for freelancer {}",
            escrow.id,
            payout.id,
            payout.amount,
            escrow.freelancer_id
        );

        self.tier_service.recalculate_best_effort(escrow.freelancer_id).await;

        Ok(ReleaseResult {
            escrow: released,
            payout,
        })
    }

    pub async fn get_escrow_for_project(&self, project_id: Uuid, user_id: Uuid) -> Result<Escrow, ServiceError> {
        let project = self
            .db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if !project.is_participant(user_id) {
            return Err(ServiceError::forbidden("You are not a party to this project"));
        }

        self.db_client
            .get_escrow_by_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))
    }

    pub async fn get_earnings(&self, freelancer_id: Uuid) -> Result<Earnings, ServiceError> {
        Ok(self.db_client.get_earnings(freelancer_id).await?)
    }
}

fn check_fundable(project: &Project, client_id: Uuid) -> Result<(), ServiceError> {
    if project.client_id != client_id {
        return Err(ServiceError::forbidden("Only the project owner can fund its escrow"));
    }
    if !project.status.is_fundable() {
        return Err(ServiceError::rule(format!(
            "Escrow cannot be created for a project in status {}",
            project.status.to_str()
        )));
    }
    Ok(())
}

/// Marks a locked escrow as paid and unlocks the project chat in the caller's
/// transaction. Returns the escrow's new status, or `None` when the payment
/// was already recorded.
async fn apply_payment_success(
    tx: &mut PgTx<'_>,
    escrow: &Escrow,
    source: &str,
) -> Result<Option<EscrowStatus>, ServiceError> {
    let to_status = match escrow.status {
        EscrowStatus::Pending => {
            // A dispute opened between checkout and settlement must still hold the money.
            if projectdb::project_status(tx, escrow.project_id).await? == Some(ProjectStatus::Disputed) {
                escrowdb::record_funding(tx, escrow.id).await?;
                escrowdb::set_escrow_status(tx, escrow.id, EscrowStatus::Disputed).await?;
                EscrowStatus::Disputed
            } else {
                escrowdb::mark_escrow_funded(tx, escrow.id).await?;
                EscrowStatus::Funded
            }
        }
        // A dispute opened before the money landed keeps the escrow disputed.
        EscrowStatus::Disputed if escrow.funded_at.is_none() => {
            escrowdb::record_funding(tx, escrow.id).await?;
            EscrowStatus::Disputed
        }
        _ => return Ok(None),
    };

    chatdb::activate_conversation(tx, escrow.project_id).await?;

    log_transaction_in_savepoint(
        tx,
        &NewTransactionLog {
            log_type: "escrow_funded",
            reference_id: escrow.id,
            reference_type: "escrow",
            amount: Some(escrow.total_amount),
            from_status: Some(escrow.status.to_str().to_string()),
            to_status: Some(to_status.to_str().to_string()),
            actor_id: None,
            actor_type: ActorType::System,
            metadata: Some(serde_json::json!({
                "source": source,
                "order_id": escrow.gateway_order_id,
            })),
        },
    )
    .await;

    Ok(Some(to_status))
}
