// db/profiledb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::{payoutmodel::BankDetails, profilemodel::*};

/// Computed tier fields written back to the profile in one statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierStats {
    pub tier: Tier,
    pub completed_projects: i32,
    pub average_rating: f64,
    pub completion_rate: f64,
    pub dispute_rate: f64,
    pub experience_points: i32,
}

#[async_trait]
pub trait ProfileExt {
    async fn get_freelancer_profile(&self, user_id: Uuid) -> Result<Option<FreelancerProfile>, Error>;

    async fn ensure_freelancer_profile(&self, user_id: Uuid) -> Result<FreelancerProfile, Error>;

    async fn update_bank_details(
        &self,
        user_id: Uuid,
        bank: &BankDetails,
    ) -> Result<FreelancerProfile, Error>;

    async fn get_tier_aggregates(&self, freelancer_id: Uuid) -> Result<TierAggregates, Error>;

    async fn save_tier_stats(&self, user_id: Uuid, stats: TierStats) -> Result<FreelancerProfile, Error>;

    async fn set_tier(&self, user_id: Uuid, tier: Tier) -> Result<Option<FreelancerProfile>, Error>;
}

#[async_trait]
impl ProfileExt for DBClient {
    async fn get_freelancer_profile(&self, user_id: Uuid) -> Result<Option<FreelancerProfile>, Error> {
        sqlx::query_as::<_, FreelancerProfile>("SELECT * FROM freelancer_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn ensure_freelancer_profile(&self, user_id: Uuid) -> Result<FreelancerProfile, Error> {
        sqlx::query_as::<_, FreelancerProfile>(
            r#"
            INSERT INTO freelancer_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_bank_details(
        &self,
        user_id: Uuid,
        bank: &BankDetails,
    ) -> Result<FreelancerProfile, Error> {
        sqlx::query_as::<_, FreelancerProfile>(
            r#"
            INSERT INTO freelancer_profiles (
                user_id, bank_code, bank_name, account_number, account_holder_name
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                bank_code = EXCLUDED.bank_code,
                bank_name = EXCLUDED.bank_name,
                account_number = EXCLUDED.account_number,
                account_holder_name = EXCLUDED.account_holder_name,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&bank.bank_code)
        .bind(&bank.bank_name)
        .bind(&bank.account_number)
        .bind(&bank.account_holder_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_tier_aggregates(&self, freelancer_id: Uuid) -> Result<TierAggregates, Error> {
        sqlx::query_as::<_, TierAggregates>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects
                 WHERE freelancer_id = $1
                   AND status IN ('completed', 'cancelled', 'disputed')) AS total_projects,
                (SELECT COUNT(*) FROM projects
                 WHERE freelancer_id = $1 AND status = 'completed') AS completed_projects,
                (SELECT COUNT(*) FROM disputes d
                 JOIN projects p ON p.id = d.project_id
                 WHERE p.freelancer_id = $1) AS dispute_count,
                (SELECT COALESCE(AVG(rating), 0)::float8 FROM reviews
                 WHERE reviewee_id = $1) AS average_rating,
                (SELECT COUNT(*) FROM reviews
                 WHERE reviewee_id = $1 AND rating = 5) AS five_star_reviews
            "#,
        )
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn save_tier_stats(&self, user_id: Uuid, stats: TierStats) -> Result<FreelancerProfile, Error> {
        sqlx::query_as::<_, FreelancerProfile>(
            r#"
            INSERT INTO freelancer_profiles (
                user_id, tier, completed_projects, average_rating,
                completion_rate, dispute_rate, experience_points
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                tier = EXCLUDED.tier,
                completed_projects = EXCLUDED.completed_projects,
                average_rating = EXCLUDED.average_rating,
                completion_rate = EXCLUDED.completion_rate,
                dispute_rate = EXCLUDED.dispute_rate,
                experience_points = EXCLUDED.experience_points,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(stats.tier)
        .bind(stats.completed_projects)
        .bind(stats.average_rating)
        .bind(stats.completion_rate)
        .bind(stats.dispute_rate)
        .bind(stats.experience_points)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_tier(&self, user_id: Uuid, tier: Tier) -> Result<Option<FreelancerProfile>, Error> {
        sqlx::query_as::<_, FreelancerProfile>(
            r#"
            UPDATE freelancer_profiles
            SET tier = $1, updated_at = NOW()
            WHERE user_id = $2
            RETURNING *
            "#,
        )
        .bind(tier)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Serializes quota-checked writes for one freelancer.
pub async fn lock_freelancer_profile(
    tx: &mut PgTx<'_>,
    user_id: Uuid,
) -> Result<Option<FreelancerProfile>, Error> {
    sqlx::query_as::<_, FreelancerProfile>(
        "SELECT * FROM freelancer_profiles WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
}
