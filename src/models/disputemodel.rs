use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

impl DisputeStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::UnderReview)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "dispute_outcome", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeOutcome {
    FullRefund,
    PartialRefund,
    NoRefund,
}

impl DisputeOutcome {
    pub fn to_str(&self) -> &str {
        match self {
            DisputeOutcome::FullRefund => "full_refund",
            DisputeOutcome::PartialRefund => "partial_refund",
            DisputeOutcome::NoRefund => "no_refund",
        }
    }

    /// Whether the outcome hands the escrowed funds to the freelancer.
    pub fn releases_funds(&self) -> bool {
        !matches!(self, DisputeOutcome::FullRefund)
    }
}

/// Why the auto-dispute sweep opened a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoDisputeKind {
    NoCommunication,
    DeadlineExceeded,
}

impl AutoDisputeKind {
    pub fn reason(&self) -> &'static str {
        match self {
            AutoDisputeKind::NoCommunication => "NO_COMMUNICATION",
            AutoDisputeKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    pub fn description(&self, ghosting_days: i64) -> String {
        match self {
            AutoDisputeKind::NoCommunication => format!(
                "[System] No messages exchanged for {} days after escrow was funded",
                ghosting_days
            ),
            AutoDisputeKind::DeadlineExceeded => {
                "[System] Project deadline passed without delivery".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub project_id: Uuid,
    pub initiator_id: Uuid,
    pub reason: String,
    pub description: String,
    pub status: DisputeStatus,
    pub is_system_generated: bool,
    pub resolution: Option<String>,
    pub outcome: Option<DisputeOutcome>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A project picked up by one of the auto-dispute sweep queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SweepCandidate {
    pub project_id: Uuid,
    pub client_id: Uuid,
}
