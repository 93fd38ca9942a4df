// handler/project.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{commondtos::ApiResponse, projectdtos::*},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn project_handler() -> Router {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:project_id/bids", post(place_bid))
        .route("/projects/:project_id/deliver", put(deliver_project))
        .route("/projects/:project_id/reviews", post(submit_review))
        .route("/bids/:bid_id/accept", put(accept_bid))
}

pub async fn create_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateProjectDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let project = app_state
        .project_service
        .create_project(
            auth.user.id,
            body.title.trim(),
            body.description.trim(),
            body.budget,
            body.deadline,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Project created successfully", project)),
    ))
}

pub async fn place_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<PlaceBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let bid = app_state
        .project_service
        .place_bid(auth.user.id, project_id, body.amount, body.proposal.trim())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Bid placed successfully", bid)),
    ))
}

pub async fn accept_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(bid_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let accepted = app_state
        .project_service
        .accept_bid(auth.user.id, bid_id)
        .await?;

    Ok(Json(ApiResponse::success("Bid accepted successfully", accepted)))
}

pub async fn deliver_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let project = app_state
        .project_service
        .deliver(auth.user.id, project_id)
        .await?;

    Ok(Json(ApiResponse::success("Project marked as delivered", project)))
}

pub async fn submit_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<SubmitReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let review = app_state
        .project_service
        .submit_review(auth.user.id, project_id, body.rating, body.comment.trim())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review submitted successfully", review)),
    ))
}
