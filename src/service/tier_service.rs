// service/tier_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        profiledb::{ProfileExt, TierStats},
    },
    models::{auditmodel::*, profilemodel::*},
    service::{audit_service::AuditService, error::ServiceError},
};

const XP_PER_COMPLETED_PROJECT: i64 = 100;
const XP_PER_FIVE_STAR_REVIEW: i64 = 50;
const XP_PENALTY_PER_DISPUTE: i64 = 75;

/// Highest tier whose thresholds are all met. Thresholds are walked in
/// ascending order and every qualifying tier overwrites the previous one.
pub fn compute_tier(completed: i64, average_rating: f64, completion_rate: f64, dispute_rate: f64) -> Tier {
    let mut tier = Tier::Bronze;
    for threshold in TIER_THRESHOLDS.iter() {
        if completed >= threshold.min_completed
            && average_rating >= threshold.min_rating
            && completion_rate >= threshold.min_completion_rate
            && dispute_rate <= threshold.max_dispute_rate
        {
            tier = threshold.tier;
        }
    }
    tier
}

pub fn experience_points(completed: i64, five_star_reviews: i64, disputes: i64) -> i64 {
    let raw = completed * XP_PER_COMPLETED_PROJECT + five_star_reviews * XP_PER_FIVE_STAR_REVIEW
        - disputes * XP_PENALTY_PER_DISPUTE;
    raw.max(0)
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).min(100.0);
    (pct * 100.0).round() / 100.0
}

pub fn derive_stats(aggregates: &TierAggregates) -> TierStats {
    let completion_rate = percentage(aggregates.completed_projects, aggregates.total_projects);
    let dispute_rate = percentage(aggregates.dispute_count, aggregates.total_projects);
    let average_rating = (aggregates.average_rating * 100.0).round() / 100.0;

    TierStats {
        tier: compute_tier(
            aggregates.completed_projects,
            average_rating,
            completion_rate,
            dispute_rate,
        ),
        completed_projects: i32::try_from(aggregates.completed_projects).unwrap_or(i32::MAX),
        average_rating,
        completion_rate,
        dispute_rate,
        experience_points: i32::try_from(experience_points(
            aggregates.completed_projects,
            aggregates.five_star_reviews,
            aggregates.dispute_count,
        ))
        .unwrap_or(i32::MAX),
    }
}

#[derive(Debug, Clone)]
pub struct TierService {
    db_client: Arc<DBClient>,
    audit_service: Arc<AuditService>,
}

impl TierService {
    pub fn new(db_client: Arc<DBClient>, audit_service: Arc<AuditService>) -> Self {
        Self {
            db_client,
            audit_service,
        }
    }

    /// Recomputes the freelancer's tier aggregates from scratch.
    pub async fn recalculate(&self, freelancer_id: Uuid) -> Result<FreelancerProfile, ServiceError> {
        let previous = self.db_client.get_freelancer_profile(freelancer_id).await?;
        let aggregates = self.db_client.get_tier_aggregates(freelancer_id).await?;
        let stats = derive_stats(&aggregates);

        let profile = self.db_client.save_tier_stats(freelancer_id, stats).await?;

        match previous.map(|p| p.tier) {
            Some(old) if old != profile.tier => tracing::info!(
                "Freelancer {} tier changed {} -> {}",
                freelancer_id,
                old.to_str(),
                profile.tier.to_str()
            ),
            _ => tracing::debug!(
                "Freelancer {} recalculated at tier {} ({} xp)",
                freelancer_id,
                profile.tier.to_str(),
                profile.experience_points
            ),
        }

        Ok(profile)
    }

    /// Post-commit side effect: never fails the caller.
    pub async fn recalculate_best_effort(&self, freelancer_id: Uuid) {
        if let Err(e) = self.recalculate(freelancer_id).await {
            tracing::error!("Tier recalculation failed for freelancer {}: {}", freelancer_id, e);
        }
    }

    pub async fn manual_tier_adjust(
        &self,
        admin_id: Uuid,
        freelancer_id: Uuid,
        tier: Tier,
        reason: &str,
    ) -> Result<FreelancerProfile, ServiceError> {
        let previous = self
            .db_client
            .get_freelancer_profile(freelancer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Freelancer profile"))?;

        let profile = self
            .db_client
            .set_tier(freelancer_id, tier)
            .await?
            .ok_or_else(|| ServiceError::not_found("Freelancer profile"))?;

        tracing::info!(
            "Admin {} set freelancer {} tier {} -> {}",
            admin_id,
            freelancer_id,
            previous.tier.to_str(),
            tier.to_str()
        );

        self.audit_service
            .try_log_admin_action(
                admin_id,
                "manual_tier_adjust",
                "freelancer",
                freelancer_id,
                Some(serde_json::json!({
                    "from": previous.tier,
                    "to": tier,
                    "reason": reason,
                })),
            )
            .await;

        self.audit_service
            .try_log_transaction(&NewTransactionLog {
                log_type: "tier_adjusted",
                reference_id: profile.id,
                reference_type: "freelancer_profile",
                amount: None,
                from_status: Some(previous.tier.to_str().to_string()),
                to_status: Some(tier.to_str().to_string()),
                actor_id: Some(admin_id),
                actor_type: ActorType::Admin,
                metadata: Some(serde_json::json!({ "reason": reason })),
            })
            .await;

        Ok(profile)
    }
}
