//! Shared API types
//!
//! Error responses for filter endpoints. Every filter failure maps to a
//! client error carrying the failure's stable code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::data::filters::{CatalogError, FilterError};

/// Standard API error response
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

/// JSON body of an error response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, code, message) = match self {
            Self::BadRequest { code, message } => ("bad_request", code.clone(), message.clone()),
            Self::NotFound { code, message } => ("not_found", code.clone(), message.clone()),
            Self::Internal { message } => ("internal_error", "INTERNAL".to_string(), message.clone()),
        };
        ErrorBody {
            error,
            code,
            message,
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        tracing::debug!(code = e.code(), error = %e, "Rejected filter request");
        match e {
            FilterError::UnrecognizedResource(_) => Self::not_found(e.code(), e.to_string()),
            _ => Self::bad_request(e.code(), e.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        tracing::error!(error = %e, "Catalog error");
        Self::internal("Resource catalog is misconfigured")
    }
}

/// `(status, Json(ErrorBody))`, so handlers can return `Result<_, ApiError>`
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
