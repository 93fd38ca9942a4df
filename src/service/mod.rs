pub mod audit_service;
pub mod background_jobs;
pub mod chat_filter;
pub mod chat_service;
pub mod dispute_service;
pub mod error;
pub mod escrow_service;
pub mod payment_gateway;
pub mod payout_service;
pub mod project_service;
pub mod tier_service;
