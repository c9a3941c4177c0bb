use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use tracing as _;

/// Structured validation errors with field-level error mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationErrors {
    Single { field: String, message: String },
    Multiple { fields: HashMap<String, String> },
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationErrors::Single { field, message } => write!(f, "{}: {}", field, message),
            ValidationErrors::Multiple { fields } => {
                let errors: Vec<String> = fields
                    .iter()
                    .map(|(field, message)| format!("{}: {}", field, message))
                    .collect();
                write!(f, "Validation errors: {}", errors.join(", "))
            }
        }
    }
}

/// The custom error type for the application.
#[derive(Debug, Error)]
pub enum Error {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("File not found: {0}")]
    FileNotFound(Uuid),

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Version {1} of file {0} not found")]
    VersionNotFound(Uuid, i32),

    #[error("File {file_id} is locked by {owner}")]
    FileLocked {
        file_id: Uuid,
        owner: Uuid,
        locked_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    },

    #[error("No lock held on file {0}")]
    LockNotFound(Uuid),

    #[error("Not authorized to act on behalf of {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Download token has expired or does not exist")]
    TokenExpired,

    #[error("Download token has already been used")]
    TokenAlreadyUsed,

    #[error("Download token does not belong to this user")]
    TokenUserMismatch,

    #[error("A project is already bound to channel {0}")]
    ProjectAlreadyExists(String),

    #[error("Content {0} is still referenced by {1} version(s)")]
    StillReferenced(String, i64),

    #[error("Content {0} failed integrity verification")]
    CorruptedContent(String),

    #[error("Storage is inconsistent with recorded metadata: {0}")]
    StorageInconsistent(String),

    #[error("Secure deletion failed: {0}")]
    DeletionError(String),

    #[error("Transient failure, retry: {0}")]
    Transient(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn create_error_body(msg: String, code: &str) -> serde_json::Value {
    serde_json::json!({ "error": msg, "code": code })
}

fn log_error(error: &Error, error_code: &str, status_code: u16) {
    if status_code >= 500 {
        tracing::error!(error_code, error = %error, status_code, "operation failed");
    } else {
        tracing::warn!(error_code, error = %error, status_code, "operation denied");
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        log_error(&self, self.error_code(), self.status_code());

        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self {
            Error::Validation(errors) => match errors {
                ValidationErrors::Single { field, message } => serde_json::json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": { field: message }
                }),
                ValidationErrors::Multiple { fields } => serde_json::json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": fields
                }),
            },
            Error::FileLocked { file_id, owner, locked_at, expires_at } => serde_json::json!({
                "error": format!("file {} is locked", file_id),
                "code": "FILE_LOCKED",
                "owner": owner,
                "lockedAt": locked_at,
                "expiresAt": expires_at,
            }),
            other => create_error_body(other.to_string(), other.error_code()),
        };

        (status, Json(body)).into_response()
    }
}

impl Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::FileNotFound(_) | Error::ProjectNotFound(_) | Error::VersionNotFound(_, _) | Error::LockNotFound(_) => 404,
            Error::FileLocked { .. } | Error::StillReferenced(_, _) => 409,
            Error::Unauthorized(_) => 401,
            Error::AccessDenied(_) => 403,
            Error::TokenExpired | Error::TokenAlreadyUsed | Error::TokenUserMismatch => 401,
            Error::ProjectAlreadyExists(_) => 409,
            Error::CorruptedContent(_) => 422,
            Error::Json(_) => 400,
            Error::Transient(_) => 503,
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::FileNotFound(_) => "FILE_NOT_FOUND",
            Error::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Error::VersionNotFound(_, _) => "VERSION_NOT_FOUND",
            Error::FileLocked { .. } => "FILE_LOCKED",
            Error::LockNotFound(_) => "LOCK_NOT_FOUND",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::AccessDenied(_) => "ACCESS_DENIED",
            Error::TokenExpired => "TOKEN_EXPIRED",
            Error::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            Error::TokenUserMismatch => "TOKEN_USER_MISMATCH",
            Error::ProjectAlreadyExists(_) => "PROJECT_ALREADY_EXISTS",
            Error::StillReferenced(_, _) => "STILL_REFERENCED",
            Error::CorruptedContent(_) => "CORRUPTED_CONTENT",
            Error::StorageInconsistent(_) => "STORAGE_INCONSISTENT",
            Error::DeletionError(_) => "DELETION_ERROR",
            Error::Transient(_) => "TRANSIENT",
            Error::Sqlx(_) => "INTERNAL_ERROR",
            Error::Io(_) => "INTERNAL_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
