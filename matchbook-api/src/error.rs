use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use matchbook_booking::BookingError;
use matchbook_session::SessionError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    PreconditionFailed(String),
    PaymentDeclined(String),
    ProviderError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn session(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound(_) | SessionError::TripNotFound(_) => {
                AppError::NotFoundError(err.to_string())
            }
            SessionError::AlreadyConverted(_) => AppError::ConflictError(err.to_string()),
            SessionError::SessionExpired(_) => AppError::AuthenticationError(err.to_string()),
        }
    }

    pub fn booking(err: BookingError) -> Self {
        match err {
            BookingError::ListingNotFound(_)
            | BookingError::RequestNotFound(_)
            | BookingError::MatchNotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::NotHost => AppError::AuthorizationError(err.to_string()),
            BookingError::AlreadyMatched(_) | BookingError::InvalidTransition { .. } => {
                AppError::ConflictError(err.to_string())
            }
            BookingError::SignaturesIncomplete => AppError::PreconditionFailed(err.to_string()),
            BookingError::PaymentDeclined(_) => AppError::PaymentDeclined(err.to_string()),
            BookingError::ProviderError(_) => AppError::ProviderError(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::PreconditionFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::PaymentDeclined(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::ProviderError(msg) => {
                tracing::error!("Payment provider error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
