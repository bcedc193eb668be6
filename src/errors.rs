// src/errors.rs
use crate::db::StoreError;
use crate::merge::Rejection;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// The due date could not be derived; usually corrupt stored data.
    #[error("{0}")]
    Calculation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Calculation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Invalid { .. } => ApiError::BadRequest(rejection.to_string()),
            Rejection::Calculation(_) => ApiError::Calculation(rejection.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Subscription {id} not found.")),
            StoreError::Rejected(rejection) => rejection.into(),
            StoreError::Io(_) | StoreError::Json(_) => {
                tracing::error!("Store failure: {}", err);
                ApiError::Internal("Failed to save subscriptions.".to_string())
            }
        }
    }
}

impl From<actix_session::SessionInsertError> for ApiError {
    fn from(err: actix_session::SessionInsertError) -> Self {
        tracing::error!("Session write failed: {}", err);
        ApiError::Internal("Session error.".to_string())
    }
}

impl From<actix_session::SessionGetError> for ApiError {
    fn from(err: actix_session::SessionGetError) -> Self {
        tracing::error!("Session read failed: {}", err);
        ApiError::Internal("Session error.".to_string())
    }
}
