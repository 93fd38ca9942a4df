#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use rekber::{
    config::Config,
    db::{db::DBClient, userdb::UserExt},
    models::{
        escrowmodel::Escrow,
        payoutmodel::BankDetails,
        projectmodel::Project,
        usermodel::{User, UserRole},
    },
    service::payment_gateway::{
        compute_signature, verify_notification_signature, GatewayError, PaymentGateway,
        PaymentNotification, TransactionSession, TransactionStatus,
    },
    AppState,
};

pub const SERVER_KEY: &str = "SB-Mid-server-test-key";
pub const JWT_SECRET: &str = "test-jwt-secret";

/// Gateway double: records created orders and answers status polls with
/// whatever status the test last set.
#[derive(Debug)]
pub struct FakeGateway {
    pub created_orders: Mutex<Vec<String>>,
    pub status: Mutex<TransactionStatus>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            created_orders: Mutex::new(Vec::new()),
            status: Mutex::new(TransactionStatus {
                transaction_status: "pending".to_string(),
                fraud_status: None,
            }),
        }
    }

    pub fn set_status(&self, transaction_status: &str, fraud_status: Option<&str>) {
        *self.status.lock().unwrap() = TransactionStatus {
            transaction_status: transaction_status.to_string(),
            fraud_status: fraud_status.map(str::to_string),
        };
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_transaction(
        &self,
        order_id: &str,
        _amount: i64,
        _payer_email: &str,
        _description: &str,
    ) -> Result<TransactionSession, GatewayError> {
        self.created_orders.lock().unwrap().push(order_id.to_string());
        Ok(TransactionSession {
            session_token: format!("snap-{}", order_id),
            redirect_url: Some(format!("https://pay.test/{}", order_id)),
        })
    }

    async fn get_transaction_status(&self, _order_id: &str) -> Result<TransactionStatus, GatewayError> {
        Ok(self.status.lock().unwrap().clone())
    }

    fn verify_signature(&self, notification: &PaymentNotification) -> bool {
        verify_notification_signature(notification, SERVER_KEY)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        port: 0,
        log_level: "debug".to_string(),
        midtrans_server_key: SERVER_KEY.to_string(),
        midtrans_is_production: false,
        gateway_timeout_secs: 5,
        platform_fee_percent: 10.0,
        min_payout_amount: 50_000,
        max_payout_amount: 100_000_000,
        auto_dispute_interval_secs: 3600,
        ghosting_days: 5,
    }
}

pub fn build_state(pool: PgPool) -> (Arc<AppState>, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::new());
    let state = AppState::new(DBClient::new(pool), test_config(), gateway.clone());
    (Arc::new(state), gateway)
}

pub async fn seed_user(state: &AppState, role: UserRole) -> User {
    let email = format!("{}-{}@example.test", role.to_str(), Uuid::new_v4());
    state
        .db_client
        .save_user("Test User", &email, role)
        .await
        .unwrap()
}

pub fn complete_bank() -> BankDetails {
    BankDetails {
        bank_code: Some("014".to_string()),
        bank_name: Some("BCA".to_string()),
        account_number: Some("1234567890".to_string()),
        account_holder_name: Some("Test Freelancer".to_string()),
    }
}

/// A project with an accepted bid of `amount`, ready for escrow.
pub async fn seed_in_progress_project(state: &AppState, client: &User, freelancer: &User, amount: i64) -> Project {
    let project = state
        .project_service
        .create_project(client.id, "Landing page", "Build a landing page for a bakery", amount, None)
        .await
        .unwrap();

    let bid = state
        .project_service
        .place_bid(freelancer.id, project.id, amount, "I can deliver this within a week")
        .await
        .unwrap();

    state
        .project_service
        .accept_bid(client.id, bid.id)
        .await
        .unwrap()
        .project
}

pub fn signed_notification(order_id: &str, transaction_status: &str, gross_amount: &str) -> PaymentNotification {
    let status_code = "200";
    PaymentNotification {
        order_id: Some(order_id.to_string()),
        transaction_status: Some(transaction_status.to_string()),
        fraud_status: Some("accept".to_string()),
        status_code: Some(status_code.to_string()),
        gross_amount: Some(gross_amount.to_string()),
        signature_key: Some(compute_signature(order_id, status_code, gross_amount, SERVER_KEY)),
    }
}

pub fn settlement_for(escrow: &Escrow) -> PaymentNotification {
    let order_id = escrow.gateway_order_id.as_deref().unwrap();
    signed_notification(order_id, "settlement", &format!("{}.00", escrow.total_amount))
}

/// Creates the escrow for `project` and settles it through the webhook path.
pub async fn seed_funded_escrow(state: &AppState, project: &Project) -> Escrow {
    let checkout = state
        .escrow_service
        .create(project.id, project.client_id)
        .await
        .unwrap();

    state
        .escrow_service
        .handle_webhook(&settlement_for(&checkout.escrow))
        .await
        .unwrap();

    state
        .escrow_service
        .get_escrow_for_project(project.id, project.client_id)
        .await
        .unwrap()
}
