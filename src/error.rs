//! Error types for taskflow
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, validation failures, missing records)
//! - 3: Conflict (in-progress deletion, duplicate unique names, permission)
//! - 4: Operation failed (I/O, malformed data, lock timeout)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskflow CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const CONFLICT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Field name used for errors that are not tied to one attribute.
pub const NON_FIELD: &str = "non_field_errors";

/// Main error type for taskflow operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Store not initialized at {0} (run `taskflow init`)")]
    NotInitialized(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Already converted: need {0}")]
    AlreadyConverted(u64),

    // Conflicts (exit code 3)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Invalid snapshot {name}: {reason}")]
    InvalidSnapshot { name: String, reason: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Build a field-scoped validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotInitialized(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation { .. }
            | Error::NotFound { .. }
            | Error::AlreadyConverted(_) => exit_codes::USER_ERROR,

            // Conflicts
            Error::Conflict(_) | Error::PermissionDenied(_) => exit_codes::CONFLICT,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::InvalidSnapshot { .. }
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Coarse error class reported as `error.kind`
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::CONFLICT => "conflict",
            _ => "operation_failed",
        }
    }

    /// Field the error is scoped to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => Some(field.as_str()),
            Error::AlreadyConverted(_) => Some(NON_FIELD),
            _ => None,
        }
    }

    /// Machine-readable details attached to JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation { field, message } => {
                let mut map = serde_json::Map::new();
                map.insert(field.clone(), serde_json::json!([message]));
                Some(serde_json::Value::Object(map))
            }
            Error::AlreadyConverted(id) => Some(serde_json::json!({
                "detail": "Already converted",
                "need": id,
            })),
            Error::NotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the JSON envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            field: err.field().map(str::to_string),
            details: err.details(),
        }
    }
}
