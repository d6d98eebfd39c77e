//! Mapping of handler failures onto HTTP responses.
//!
//! Every failure is rendered as an [`ErrorBody`] `{code, message}`.
//! Infrastructure errors are logged and replaced by an opaque body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dispatch_core::error::OrderError;
use dispatch_sdk::objects::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Malformed request metadata such as identity headers.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("invalid admin credentials")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Order(OrderError::Validation(message.into()))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Order(e) => match e {
                OrderError::NotFound | OrderError::ItemNotFound => StatusCode::NOT_FOUND,
                OrderError::NotActive => StatusCode::GONE,
                OrderError::InvalidTransition { .. }
                | OrderError::AlreadyAssigned
                | OrderError::NotReady(_)
                | OrderError::Conflict
                | OrderError::OrderLocked(_) => StatusCode::CONFLICT,
                OrderError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Order(e) => e.code(),
            ApiError::BadRequest { code, .. } => code,
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Order(OrderError::Database(e)) => {
                tracing::error!(error = %e, "API database error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
