use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    /// A third-party service (generation, payments, mail) failed. The detail
    /// is logged and the caller only sees the public message.
    #[error("Upstream error: {detail}")]
    Upstream {
        detail: String,
        public_message: &'static str,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(detail: impl Into<String>, public_message: &'static str) -> Self {
        AppError::Upstream {
            detail: detail.into(),
            public_message,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error"
            }
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Cache error"
            }
            AppError::Auth(ref msg)
            | AppError::Validation(ref msg)
            | AppError::Forbidden(ref msg)
            | AppError::NotFound(ref msg) => msg.as_str(),
            AppError::RateLimit => "Too many requests, please try again later.",
            AppError::Upstream {
                ref detail,
                public_message,
            } => {
                tracing::error!("Upstream error: {}", detail);
                public_message
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal server error"
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
