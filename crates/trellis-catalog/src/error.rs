use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::validate::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(String),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "NOT_FOUND",
            CatalogError::Forbidden(_) => "FORBIDDEN",
            CatalogError::Validation(_) => "VALIDATION_ERROR",
            CatalogError::InvalidInput(_) => "INVALID_INPUT",
            CatalogError::Database(_) => "DB_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
            CatalogError::Validation(_) | CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Public message payload. Validation errors expose the flattened
    /// field-error map rather than a free-text string; nothing leaks the
    /// underlying exception.
    pub fn message(&self) -> serde_json::Value {
        match self {
            CatalogError::Validation(errors) => serde_json::json!(errors.field_errors),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": { "code": self.code(), "message": self.message() },
        });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}
