use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database unavailable")]
    StoreUnavailable,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SimulatedFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the intentional payment failures, as opposed to genuine faults.
    pub fn is_simulated(&self) -> bool {
        matches!(self, AppError::SimulatedFailure(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::StoreUnavailable | AppError::NotFound(_) => {
                json!({ "error": self.to_string() })
            }
            AppError::SimulatedFailure(message) => {
                json!({ "status": "error", "message": message })
            }
            // Detail is logged by the caller and never sent to the client.
            _ => json!({ "error": "Internal server error" }),
        };

        (status, Json(body)).into_response()
    }
}
