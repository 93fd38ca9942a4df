// service/background_jobs.rs
use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::AppState;

/// Periodically opens system disputes for ghosted and overdue projects.
/// The first sweep runs one full interval after startup.
pub async fn start_auto_dispute_job(app_state: Arc<AppState>) {
    let period = Duration::from_secs(app_state.env.auto_dispute_interval_secs.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // interval() fires immediately on the first tick
    ticker.tick().await;

    tracing::info!("Auto-dispute job started, sweeping every {:?}", period);

    loop {
        ticker.tick().await;

        match app_state.dispute_service.run_auto_dispute_sweep().await {
            Ok(created) if created.is_empty() => {
                tracing::debug!("Auto-dispute sweep finished, nothing to open");
            }
            Ok(created) => {
                tracing::info!("Auto-dispute sweep opened {} dispute(s)", created.len());
            }
            Err(e) => {
                tracing::error!("Auto-dispute sweep failed: {}", e);
            }
        }
    }
}
