// handler/dispute.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{commondtos::ApiResponse, disputedtos::CreateDisputeDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn dispute_handler() -> Router {
    Router::new()
        .route("/", post(create_dispute))
        .route("/:dispute_id", get(get_dispute))
}

pub async fn create_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let dispute = app_state
        .dispute_service
        .create_dispute(
            auth.user.id,
            body.project_id,
            body.reason.trim(),
            body.description.trim(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Dispute opened successfully", dispute)),
    ))
}

pub async fn get_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(dispute_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let dispute = app_state
        .dispute_service
        .get_dispute(dispute_id, auth.user.id, auth.is_admin())
        .await?;

    Ok(Json(ApiResponse::success("Dispute retrieved successfully", dispute)))
}
