// handler/chat.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        chatdtos::SendMessageDto,
        commondtos::{ApiResponse, RequestQueryDto},
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/project/:project_id", get(get_project_conversation))
        .route(
            "/:conversation_id/messages",
            get(get_messages).post(send_message),
        )
}

pub async fn get_project_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let conversation = app_state
        .chat_service
        .get_project_conversation(project_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Conversation retrieved successfully", conversation)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let sent = app_state
        .chat_service
        .send_message(auth.user.id, conversation_id, &body.content)
        .await?;

    let message = if sent.is_blocked {
        "Message blocked: sharing contact details is not allowed before the escrow is funded"
    } else if !sent.flags.is_empty() {
        "Message sent with contact details redacted"
    } else {
        "Message sent"
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(message, sent))))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::unprocessable(e.to_string()))?;

    let (limit, offset) = query.limit_offset();
    let messages = app_state
        .chat_service
        .list_messages(auth.user.id, conversation_id, limit, offset)
        .await?;

    Ok(Json(ApiResponse::success("Messages retrieved successfully", messages)))
}
