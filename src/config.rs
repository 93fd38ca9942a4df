use anyhow::{anyhow, Context, Result};

use crate::utils::currency::parse_idr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub log_level: String,
    // Payment gateway
    pub midtrans_server_key: String,
    pub midtrans_is_production: bool,
    pub gateway_timeout_secs: u64,
    // Marketplace rules
    pub platform_fee_percent: f64,
    pub min_payout_amount: i64,
    pub max_payout_amount: i64,
    // Auto-dispute sweep
    pub auto_dispute_interval_secs: u64,
    pub ghosting_days: i64,
}

impl Config {
    pub fn init() -> Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let midtrans_server_key =
            std::env::var("MIDTRANS_SERVER_KEY").context("MIDTRANS_SERVER_KEY must be set")?;

        Ok(Config {
            database_url,
            jwt_secret,
            port: parse_or("PORT", 8000)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            midtrans_server_key,
            midtrans_is_production: parse_or("MIDTRANS_IS_PRODUCTION", false)?,
            gateway_timeout_secs: parse_or("GATEWAY_TIMEOUT_SECS", 30)?,
            platform_fee_percent: parse_or("PLATFORM_FEE_PERCENT", 10.0)?,
            min_payout_amount: idr_or("MIN_PAYOUT_AMOUNT", 50_000)?,
            max_payout_amount: idr_or("MAX_PAYOUT_AMOUNT", 100_000_000)?,
            auto_dispute_interval_secs: parse_or("AUTO_DISPUTE_INTERVAL_SECS", 3600)?,
            ghosting_days: parse_or("GHOSTING_DAYS", 5)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// Rupiah amounts may be written as `50000`, `50.000` or `Rp 50.000`.
fn idr_or(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(raw) => parse_idr(&raw).map_err(|e| anyhow!("{} has an invalid value: {} ({})", key, raw, e)),
        Err(_) => Ok(default),
    }
}
