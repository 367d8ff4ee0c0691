use crate::services::{inventory_service::InventoryError, repository::StorageError};
use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error. The message is what the
    /// client sees, so keep driver and I/O details out of it.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::not_found("item not found"),
            StorageError::EmptyUpdate => AppError::bad_request("nothing to update"),
            StorageError::Conflict(id) => {
                AppError::new(StatusCode::CONFLICT, format!("item `{}` already exists", id))
            }
            other => {
                tracing::error!("storage failure: {}", other);
                AppError::internal("internal server error")
            }
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => AppError::bad_request(msg),
            InventoryError::ItemNotFound(_) => AppError::not_found("item not found"),
            InventoryError::PhotoNotFound(_) => AppError::not_found("photo not found"),
            InventoryError::Storage(inner) => inner.into(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

/// Missing content type, malformed JSON and mistyped fields are all a bad
/// request; serde's wording stays in the logs.
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        tracing::debug!("rejected JSON body: {}", err.body_text());
        AppError::bad_request("invalid JSON body")
    }
}
