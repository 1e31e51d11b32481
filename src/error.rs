//! Unified application error model and mapping helpers.
//! Every preset operation reports one of these kinds; the HTTP layer turns them
//! into a status code and a JSON error body.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Message returned to clients for internal faults. The real cause is only logged.
pub const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    Conflict { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Wrap an I/O failure as an internal fault, keeping the context for the log line.
    pub fn io(context: &str, err: std::io::Error) -> Self {
        AppError::Internal { code: "io_error".into(), message: format!("{context}: {err}") }
    }

    /// Map to HTTP status code.
    ///
    /// A rename collision is a client error on the wire (400), told apart from
    /// other client errors by its code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 400,
            AppError::Internal { .. } => 500,
        }
    }

    /// JSON error body. Internal faults never expose their message.
    pub fn to_body(&self) -> serde_json::Value {
        let message = match self {
            AppError::Internal { .. } => GENERIC_INTERNAL_MESSAGE,
            other => other.message(),
        };
        json!({
            "status": "error",
            "code": self.code_str(),
            "message": message,
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
