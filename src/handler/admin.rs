// handler/admin.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{delete, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        commondtos::ApiResponse,
        disputedtos::{ManualTierAdjustDto, ResolveDisputeDto},
        payoutdtos::FailPayoutDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/disputes/sweep", post(run_dispute_sweep))
        .route("/disputes/:dispute_id/resolve", put(resolve_dispute))
        .route("/payouts/:payout_id/process", put(process_payout))
        .route("/payouts/:payout_id/complete", put(complete_payout))
        .route("/payouts/:payout_id/fail", put(fail_payout))
        .route("/freelancers/:freelancer_id/tier", put(adjust_tier))
        .route("/freelancers/:freelancer_id/recalculate", post(recalculate_tier))
        .route("/projects/:project_id", delete(delete_project))
}

pub async fn resolve_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(dispute_id): Path<Uuid>,
    Json(body): Json<ResolveDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let dispute = app_state
        .dispute_service
        .resolve_dispute(dispute_id, auth.user.id, body.resolution.trim(), body.outcome)
        .await?;

    Ok(Json(ApiResponse::success("Dispute resolved successfully", dispute)))
}

pub async fn run_dispute_sweep(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("Admin {} triggered the auto-dispute sweep", auth.user.id);

    let created = app_state.dispute_service.run_auto_dispute_sweep().await?;

    Ok(Json(ApiResponse::success(
        &format!("Sweep complete, {} dispute(s) opened", created.len()),
        created,
    )))
}

pub async fn process_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payout = app_state
        .payout_service
        .process_payout(auth.user.id, payout_id)
        .await?;

    Ok(Json(ApiResponse::success("Payout is being processed", payout)))
}

pub async fn complete_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payout = app_state
        .payout_service
        .complete_payout(auth.user.id, payout_id)
        .await?;

    Ok(Json(ApiResponse::success("Payout completed", payout)))
}

pub async fn fail_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payout_id): Path<Uuid>,
    Json(body): Json<FailPayoutDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let payout = app_state
        .payout_service
        .fail_payout(auth.user.id, payout_id, body.reason.trim())
        .await?;

    Ok(Json(ApiResponse::success("Payout marked as failed", payout)))
}

pub async fn adjust_tier(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(freelancer_id): Path<Uuid>,
    Json(body): Json<ManualTierAdjustDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let profile = app_state
        .tier_service
        .manual_tier_adjust(auth.user.id, freelancer_id, body.tier, body.reason.trim())
        .await?;

    Ok(Json(ApiResponse::success("Tier updated successfully", profile)))
}

pub async fn recalculate_tier(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(freelancer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state.tier_service.recalculate(freelancer_id).await?;

    Ok(Json(ApiResponse::success("Tier recalculated", profile)))
}

pub async fn delete_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .project_service
        .admin_delete_project(auth.user.id, project_id)
        .await?;

    Ok(Json(ApiResponse::message("Project deleted successfully")))
}
