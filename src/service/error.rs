use axum::http::StatusCode;
use thiserror::Error;

use crate::{
    error::{ErrorMessage, HttpError},
    service::payment_gateway::GatewayError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Domain rule violation carrying the status it should surface with.
    #[error("{message}")]
    App { status: StatusCode, message: String },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        ServiceError::NotFound(entity.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    /// Wrong state for a transition, amounts outside limits, and similar rule breaks.
    pub fn rule(message: impl Into<String>) -> Self {
        ServiceError::App {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::App { status, .. } => *status,
            ServiceError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Database(_) | ServiceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps a unique-constraint violation (SQLSTATE 23505) to `Conflict`.
    pub fn conflict_on_duplicate(error: sqlx::Error, message: &str) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                ServiceError::Conflict(message.to_string())
            }
            _ => ServiceError::Database(error),
        }
    }

    /// SQLSTATE 40001 / 40P01: the transaction lost a serialization race and may be retried.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            ServiceError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Database(_) | ServiceError::Other(_) => {
                tracing::error!("Internal error: {:?}", error);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            ServiceError::Gateway(ref e) => {
                tracing::error!("Payment gateway failure: {}", e);
                HttpError::bad_gateway("Payment gateway is unavailable, please try again")
            }
            _ => HttpError::new(error.to_string(), status),
        }
    }
}
