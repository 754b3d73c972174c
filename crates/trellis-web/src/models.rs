use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use trellis_auth::AuthError;
use trellis_catalog::CatalogError;

/// Success envelope: `{ "success": true, "data": ... }`.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Unified route error. Denials and failures expose `{code, message}` only;
/// internals never leak into the body.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Catalog(CatalogError),
    Custom {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Custom {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    pub fn payload_too_large(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Custom {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code,
            message: message.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Catalog(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::Catalog(e) => e.into_response(),
            ApiError::Custom {
                status,
                code,
                message,
            } => {
                let body = json!({
                    "success": false,
                    "error": { "code": code, "message": message },
                });
                (status, Json(body)).into_response()
            }
        }
    }
}
