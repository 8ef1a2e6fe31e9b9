//! Error types for the library service

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrors;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Field-level rule violated by user input
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("{title} is out of stock")]
    OutOfStock { title: String },

    #[error("The book has already been returned")]
    AlreadyReturned,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation { .. }
            | AppError::InvalidInput(_)
            | AppError::OutOfStock { .. }
            | AppError::AlreadyReturned => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent back to the client
    fn body(&self) -> Value {
        match self {
            AppError::Authentication(msg) | AppError::Authorization(msg) | AppError::NotFound(msg) => {
                json!({ "detail": msg })
            }
            AppError::Validation { field, message } => {
                let mut fields = Map::new();
                fields.insert(field.clone(), json!([message]));
                Value::Object(fields)
            }
            AppError::InvalidInput(errors) => {
                let mut fields = Map::new();
                for (field, errs) in errors.field_errors() {
                    let messages: Vec<String> = errs
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), json!(messages));
                }
                Value::Object(fields)
            }
            AppError::OutOfStock { .. } => json!({ "book": self.to_string() }),
            AppError::AlreadyReturned => json!({ "error": self.to_string() }),
            AppError::Database(_) => json!({ "detail": "Database error" }),
            AppError::Internal(_) => json!({ "detail": "Internal server error" }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let (field, message) = rejected_field(&err.body_text());
                AppError::validation(field, message)
            }
            other => AppError::validation(NON_FIELD_ERRORS, other.body_text()),
        }
    }
}

const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Split a body deserialization error into the offending field and a message.
///
/// The text looks like `<prefix>: <path>: <serde error>`, or
/// `<prefix>: missing field `name` at ...` when a field is absent.
fn rejected_field(text: &str) -> (String, String) {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);

    if let Some((path, message)) = detail.split_once(": ") {
        if !path.is_empty() && !path.contains(char::is_whitespace) {
            return (path.to_string(), message.to_string());
        }
    }

    if let Some(rest) = detail.strip_prefix("missing field `") {
        if let Some((name, _)) = rest.split_once('`') {
            return (name.to_string(), "This field is required.".to_string());
        }
    }

    (NON_FIELD_ERRORS.to_string(), detail.to_string())
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
