pub mod chatdb;
pub mod db;
pub mod disputedb;
pub mod escrowdb;
pub mod payoutdb;
pub mod profiledb;
pub mod projectdb;
pub mod userdb;
