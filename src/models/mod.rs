pub mod auditmodel;
pub mod chatmodel;
pub mod disputemodel;
pub mod escrowmodel;
pub mod payoutmodel;
pub mod profilemodel;
pub mod projectmodel;
pub mod usermodel;
