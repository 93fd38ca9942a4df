pub mod chatdtos;
pub mod commondtos;
pub mod disputedtos;
pub mod escrowdtos;
pub mod payoutdtos;
pub mod projectdtos;
