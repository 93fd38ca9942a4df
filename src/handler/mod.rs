pub mod admin;
pub mod chat;
pub mod dispute;
pub mod escrow;
pub mod payout;
pub mod project;
