pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::db::DBClient;
use service::{
    audit_service::AuditService, chat_service::ChatService, dispute_service::DisputeService,
    escrow_service::EscrowService, payment_gateway::PaymentGateway,
    payout_service::PayoutService, project_service::ProjectService, tier_service::TierService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub audit_service: Arc<AuditService>,
    pub tier_service: Arc<TierService>,
    pub escrow_service: Arc<EscrowService>,
    pub dispute_service: Arc<DisputeService>,
    pub payout_service: Arc<PayoutService>,
    pub chat_service: Arc<ChatService>,
    pub project_service: Arc<ProjectService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        let db_client_arc = Arc::new(db_client);

        let audit_service = Arc::new(AuditService::new(db_client_arc.clone()));
        let tier_service = Arc::new(TierService::new(db_client_arc.clone(), audit_service.clone()));

        let escrow_service = Arc::new(EscrowService::new(
            db_client_arc.clone(),
            gateway,
            tier_service.clone(),
            audit_service.clone(),
            config.platform_fee_percent,
        ));

        let dispute_service = Arc::new(DisputeService::new(
            db_client_arc.clone(),
            audit_service.clone(),
            tier_service.clone(),
            config.ghosting_days,
        ));

        let payout_service = Arc::new(PayoutService::new(
            db_client_arc.clone(),
            audit_service.clone(),
            config.min_payout_amount,
            config.max_payout_amount,
        ));

        let chat_service = Arc::new(ChatService::new(db_client_arc.clone()));

        let project_service = Arc::new(ProjectService::new(
            db_client_arc.clone(),
            tier_service.clone(),
            audit_service.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            audit_service,
            tier_service,
            escrow_service,
            dispute_service,
            payout_service,
            chat_service,
            project_service,
        }
    }
}
