//! Application error type shared by the HTTP and WebSocket surfaces.
//!
//! Every failure that reaches a client is rendered with the same envelope:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Short code not found", "details": {} } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Error envelope written to HTTP bodies and live error frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Conflict { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Machine-readable error code used in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    /// Converts the error into its wire envelope.
    pub fn into_body(self) -> ErrorBody {
        let code = self.code().to_string();
        let (message, details) = match self {
            AppError::Validation { message, details }
            | AppError::NotFound { message, details }
            | AppError::Conflict { message, details }
            | AppError::Internal { message, details } => (message, details),
        };

        ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!("Database error: {}", e);
        AppError::internal("Database error", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
        AppError::bad_request("Request validation failed", json!({ "fields": fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_statuses() {
        let cases = [
            (AppError::bad_request("x", json!({})), 400, "validation_error"),
            (AppError::not_found("x", json!({})), 404, "not_found"),
            (AppError::conflict("x", json!({})), 409, "conflict"),
            (AppError::internal("x", json!({})), 500, "internal_error"),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status().as_u16(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_into_body_keeps_message_and_details() {
        let body = AppError::not_found("Short code not found", json!({ "code": "abc123" }))
            .into_body();

        assert_eq!(body.error.code, "not_found");
        assert_eq!(body.error.message, "Short code not found");
        assert_eq!(body.error.details["code"], "abc123");
    }

    #[test]
    fn test_display_uses_message() {
        let error = AppError::internal("Could not generate unique short code.", json!({}));
        assert_eq!(error.to_string(), "Could not generate unique short code.");
    }

    #[test]
    fn test_validation_errors_list_failing_fields() {
        use validator::Validate;

        #[derive(Validate)]
        struct Payload {
            #[validate(url)]
            url: String,
        }

        let errors = Payload {
            url: "not-a-url".to_string(),
        }
        .validate()
        .unwrap_err();

        let body = AppError::from(errors).into_body();

        assert_eq!(body.error.code, "validation_error");
        assert_eq!(body.error.details["fields"], json!(["url"]));
    }
}
