//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("invalid environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },
    #[error("invalid resource name: '{0}'")]
    InvalidResourceName(String),
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("external '{name}' failed: {reason}")]
    External { name: String, reason: String },
    #[error("external not registered: {0}")]
    ExternalNotRegistered(&'static str),
    #[error("startup timed out after {0:?}")]
    StartupTimeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persistence: {0}")]
    Persistence(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("request timed out")]
    Timeout,
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), message.into());
        AppError::Validation {
            message: "Unprocessable Entity".into(),
            fields,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            // Duplicate unique fields are reported as a plain bad request.
            AppError::Conflict(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Config(_)
            | AppError::Db(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Persistence(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation { .. } => "validation_error",
            AppError::Db(_) => "database_error",
            AppError::Io(_) | AppError::Json(_) | AppError::Persistence(_) => "persistence_error",
            AppError::Conflict(_) => "conflict",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Timeout => "request_timeout",
            AppError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        };
        let details = match &self {
            AppError::Validation { fields, .. } => serde_json::to_value(fields).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
