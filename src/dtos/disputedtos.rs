use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{disputemodel::DisputeOutcome, profilemodel::Tier};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDisputeDto {
    pub project_id: Uuid,

    #[validate(length(min = 3, max = 100, message = "Reason must be between 3 and 100 characters"))]
    pub reason: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveDisputeDto {
    #[validate(length(min = 10, max = 5000, message = "Resolution must be between 10 and 5000 characters"))]
    pub resolution: String,

    pub outcome: DisputeOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManualTierAdjustDto {
    pub tier: Tier,

    #[validate(length(min = 3, max = 1000, message = "Reason must be between 3 and 1000 characters"))]
    pub reason: String,
}
