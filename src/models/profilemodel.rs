use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payoutmodel::BankDetails;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "freelancer_tier", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Legend,
}

/// Minimums (and the dispute-rate maximum) a freelancer must meet for a tier.
#[derive(Debug, Clone, Copy)]
pub struct TierThreshold {
    pub tier: Tier,
    pub min_completed: i64,
    pub min_rating: f64,
    pub min_completion_rate: f64,
    pub max_dispute_rate: f64,
}

pub const TIER_THRESHOLDS: [TierThreshold; 5] = [
    TierThreshold { tier: Tier::Bronze, min_completed: 0, min_rating: 0.0, min_completion_rate: 0.0, max_dispute_rate: 100.0 },
    TierThreshold { tier: Tier::Silver, min_completed: 5, min_rating: 4.0, min_completion_rate: 80.0, max_dispute_rate: 10.0 },
    TierThreshold { tier: Tier::Gold, min_completed: 20, min_rating: 4.5, min_completion_rate: 90.0, max_dispute_rate: 5.0 },
    TierThreshold { tier: Tier::Platinum, min_completed: 50, min_rating: 4.7, min_completion_rate: 95.0, max_dispute_rate: 3.0 },
    TierThreshold { tier: Tier::Legend, min_completed: 100, min_rating: 4.9, min_completion_rate: 98.0, max_dispute_rate: 1.0 },
];

impl Tier {
    pub fn to_str(&self) -> &str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Legend => "legend",
        }
    }

    /// Bids a freelancer of this tier may place per calendar month. `None` is unlimited.
    pub fn monthly_bid_limit(&self) -> Option<i64> {
        match self {
            Tier::Bronze => Some(10),
            Tier::Silver => Some(20),
            Tier::Gold => Some(40),
            Tier::Platinum => Some(80),
            Tier::Legend => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct FreelancerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: Tier,
    pub completed_projects: i32,
    pub average_rating: f64,
    pub completion_rate: f64,
    pub dispute_rate: f64,
    pub experience_points: i32,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FreelancerProfile {
    pub fn bank_details(&self) -> BankDetails {
        BankDetails {
            bank_code: self.bank_code.clone(),
            bank_name: self.bank_name.clone(),
            account_number: self.account_number.clone(),
            account_holder_name: self.account_holder_name.clone(),
        }
    }
}

/// Raw counts the tier engine derives everything else from.
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct TierAggregates {
    pub total_projects: i64,
    pub completed_projects: i64,
    pub dispute_count: i64,
    pub average_rating: f64,
    pub five_star_reviews: i64,
}
