use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Admin,
    System,
}

impl ActorType {
    pub fn to_str(&self) -> &str {
        match self {
            ActorType::User => "user",
            ActorType::Admin => "admin",
            ActorType::System => "system",
        }
    }
}

/// One immutable entry in the financial audit trail.
#[derive(Debug, Clone)]
pub struct NewTransactionLog {
    pub log_type: &'static str,
    pub reference_id: Uuid,
    pub reference_type: &'static str,
    pub amount: Option<i64>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub actor_id: Option<Uuid>,
    pub actor_type: ActorType,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TransactionLog {
    pub id: Uuid,
    pub log_type: String,
    pub reference_id: Uuid,
    pub reference_type: String,
    pub amount: Option<i64>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub actor_id: Option<Uuid>,
    pub actor_type: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Uuid,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
