// handler/payout.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{commondtos::ApiResponse, payoutdtos::*},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn payout_handler() -> Router {
    Router::new()
        .route("/", get(list_payouts).post(request_payout))
        .route("/balance", get(get_balance))
        .route("/bank-details", put(update_bank_details))
        .route("/:payout_id", delete(cancel_payout))
}

pub async fn list_payouts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let payouts = app_state.payout_service.list_payouts(auth.user.id).await?;

    Ok(Json(ApiResponse::success("Payouts retrieved successfully", payouts)))
}

pub async fn get_balance(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let balance = app_state
        .payout_service
        .get_available_balance(auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Balance retrieved successfully", balance)))
}

pub async fn request_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RequestPayoutDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let payout = app_state
        .payout_service
        .request_payout(auth.user.id, body.amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Payout requested successfully", payout)),
    ))
}

pub async fn cancel_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .payout_service
        .cancel_payout(payout_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::message("Payout cancelled successfully")))
}

pub async fn update_bank_details(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<BankDetailsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let bank = app_state
        .payout_service
        .update_bank_details(auth.user.id, &body.into())
        .await?;

    Ok(Json(ApiResponse::success("Bank details updated successfully", bank)))
}
