use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Open,
    InProgress,
    Delivered,
    Completed,
    Disputed,
    Cancelled,
}

impl ProjectStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Delivered => "delivered",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Disputed => "disputed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Work exists and the client may release funds.
    pub fn is_releasable(&self) -> bool {
        matches!(self, ProjectStatus::Delivered | ProjectStatus::Completed)
    }

    /// An assigned project whose escrow can still be paid into.
    pub fn is_fundable(&self) -> bool {
        matches!(self, ProjectStatus::InProgress | ProjectStatus::Delivered)
    }

    pub fn is_disputable(&self) -> bool {
        matches!(self, ProjectStatus::InProgress | ProjectStatus::Delivered)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub project_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: i64,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub project_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
