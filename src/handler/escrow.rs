// handler/escrow.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{commondtos::ApiResponse, escrowdtos::CreateEscrowDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::{escrow_service::WebhookOutcome, payment_gateway::PaymentNotification},
    AppState,
};

pub fn escrow_handler() -> Router {
    Router::new()
        .route("/", post(create_escrow))
        .route("/earnings", get(get_earnings))
        .route("/project/:project_id", get(get_project_escrow))
        .route("/:escrow_id/check-status", post(check_payment_status))
        .route("/:escrow_id/retry", post(retry_payment))
        .route("/:escrow_id/release", post(release_escrow))
}

pub async fn create_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateEscrowDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let checkout = app_state
        .escrow_service
        .create(body.project_id, auth.user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Escrow created, complete the payment to fund it", checkout)),
    ))
}

pub async fn get_project_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let escrow = app_state
        .escrow_service
        .get_escrow_for_project(project_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Escrow retrieved successfully", escrow)))
}

pub async fn check_payment_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(escrow_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let check = app_state
        .escrow_service
        .check_payment_status(escrow_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Payment status checked", check)))
}

pub async fn retry_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(escrow_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let checkout = app_state
        .escrow_service
        .retry_payment(escrow_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("New checkout session created", checkout)))
}

pub async fn release_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(escrow_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let released = app_state
        .escrow_service
        .release(escrow_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Escrow released to the freelancer", released)))
}

pub async fn get_earnings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let earnings = app_state.escrow_service.get_earnings(auth.user.id).await?;

    Ok(Json(ApiResponse::success("Earnings retrieved successfully", earnings)))
}

/// Gateway notification endpoint. Always answers 200 so the gateway stops
/// redelivering; rejected notifications are logged and dropped.
pub async fn payment_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let notification = match serde_json::from_slice::<PaymentNotification>(&body) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!("Discarding unparseable payment notification: {}", e);
            return (StatusCode::OK, Json(json!({ "status": "ok" })));
        }
    };

    match app_state.escrow_service.handle_webhook(&notification).await {
        Ok(WebhookOutcome::Discarded(reason)) => {
            tracing::debug!("Payment notification discarded: {}", reason);
        }
        Ok(outcome) => {
            tracing::debug!("Payment notification handled: {:?}", outcome);
        }
        Err(e) => {
            tracing::error!(
                "Failed to process payment notification for order {:?}: {}",
                notification.order_id,
                e
            );
        }
    }

    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
