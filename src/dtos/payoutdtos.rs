use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::payoutmodel::BankDetails;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestPayoutDto {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FailPayoutDto {
    #[validate(length(min = 3, max = 1000, message = "Reason must be between 3 and 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BankDetailsDto {
    #[validate(length(min = 2, max = 20, message = "Bank code is required"))]
    pub bank_code: String,

    #[validate(length(min = 2, max = 100, message = "Bank name is required"))]
    pub bank_name: String,

    #[validate(length(min = 5, max = 30, message = "Account number must be between 5 and 30 characters"))]
    pub account_number: String,

    #[validate(length(min = 2, max = 100, message = "Account holder name is required"))]
    pub account_holder_name: String,
}

impl From<BankDetailsDto> for BankDetails {
    fn from(dto: BankDetailsDto) -> Self {
        BankDetails {
            bank_code: Some(dto.bank_code.trim().to_string()),
            bank_name: Some(dto.bank_name.trim().to_string()),
            account_number: Some(dto.account_number.trim().to_string()),
            account_holder_name: Some(dto.account_holder_name.trim().to_string()),
        }
    }
}
