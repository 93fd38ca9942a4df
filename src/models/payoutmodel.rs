use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, to: PayoutStatus) -> bool {
        matches!(
            (self, to),
            (PayoutStatus::Pending, PayoutStatus::Processing)
                | (PayoutStatus::Processing, PayoutStatus::Completed)
                | (PayoutStatus::Pending, PayoutStatus::Failed)
                | (PayoutStatus::Processing, PayoutStatus::Failed)
        )
    }
}

/// Bank details copied onto a payout when it is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BankDetails {
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder_name: Option<String>,
}

impl BankDetails {
    pub fn is_complete(&self) -> bool {
        [
            &self.bank_code,
            &self.bank_name,
            &self.account_number,
            &self.account_holder_name,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(false, |v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub freelancer_id: Uuid,
    pub escrow_id: Option<Uuid>,
    pub amount: i64,
    pub status: PayoutStatus,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder_name: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_transitions() {
        assert!(PayoutStatus::Pending.can_transition_to(PayoutStatus::Processing));
        assert!(PayoutStatus::Processing.can_transition_to(PayoutStatus::Completed));
        assert!(PayoutStatus::Pending.can_transition_to(PayoutStatus::Failed));
        assert!(PayoutStatus::Processing.can_transition_to(PayoutStatus::Failed));

        assert!(!PayoutStatus::Pending.can_transition_to(PayoutStatus::Completed));
        assert!(!PayoutStatus::Completed.can_transition_to(PayoutStatus::Failed));
        assert!(!PayoutStatus::Failed.can_transition_to(PayoutStatus::Processing));
    }

    #[test]
    fn test_bank_details_completeness() {
        let mut details = BankDetails {
            bank_code: Some("014".to_string()),
            bank_name: Some("BCA".to_string()),
            account_number: Some("1234567890".to_string()),
            account_holder_name: Some("Budi Santoso".to_string()),
        };
        assert!(details.is_complete());

        details.account_holder_name = Some("   ".to_string());
        assert!(!details.is_complete());

        assert!(!BankDetails::default().is_complete());
    }
}
