use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    Pending,
    Funded,
    Released,
    Refunded,
    Disputed,
}

impl EscrowStatus {
    pub fn to_str(&self) -> &str {
        match self {
            EscrowStatus::Pending => "pending",
            EscrowStatus::Funded => "funded",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
            EscrowStatus::Disputed => "disputed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EscrowStatus::Released | EscrowStatus::Refunded)
    }

    pub fn can_transition_to(&self, to: EscrowStatus) -> bool {
        matches!(
            (self, to),
            (EscrowStatus::Pending, EscrowStatus::Funded)
                | (EscrowStatus::Pending, EscrowStatus::Disputed)
                | (EscrowStatus::Funded, EscrowStatus::Released)
                | (EscrowStatus::Funded, EscrowStatus::Disputed)
                | (EscrowStatus::Disputed, EscrowStatus::Released)
                | (EscrowStatus::Disputed, EscrowStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Escrow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub total_amount: i64,
    pub platform_fee: i64,
    pub freelancer_amount: i64,
    pub status: EscrowStatus,
    pub gateway_order_id: Option<String>,
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    pub funded_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Escrow {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }
}

/// Split of an escrow total between the platform and the freelancer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscrowAmounts {
    pub total_amount: i64,
    pub platform_fee: i64,
    pub freelancer_amount: i64,
}

impl EscrowAmounts {
    pub fn from_total(total_amount: i64, fee_percent: f64) -> Self {
        let platform_fee = (total_amount as f64 * fee_percent / 100.0).round() as i64;
        Self {
            total_amount,
            platform_fee,
            freelancer_amount: total_amount - platform_fee,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Earnings {
    pub total_earned: i64,
    pub in_escrow: i64,
    pub this_month: i64,
}
