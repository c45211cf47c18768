use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid fields: {0:?}")]
    InvalidFields(Vec<FieldError>),
    /// The committed date stopped being available after the draft was created.
    #[error("Selection no longer available: {0}")]
    StaleSelection(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    /// Payment captured but the booking could not be committed. Needs an operator.
    #[error("Finalization conflict for intent {intent_id} (draft {draft_token:?}, date {date:?}): {reason}")]
    FinalizationConflict {
        intent_id: String,
        draft_token: Option<String>,
        date: Option<NaiveDate>,
        reason: String,
    },
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// 2067 = SQLite unique constraint, 23505 = PostgreSQL unique violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(e) => e
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .is_some_and(|code| code == "2067" || code == "23505"),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unique_violation() {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Resource already exists (duplicate entry)" })),
            )
                .into_response();
        }

        let (status, body) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::InvalidFields(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Invalid input", "fields": fields }),
            ),
            AppError::StaleSelection(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": msg, "redirect": "selection" }),
            ),
            AppError::Gateway(msg) => {
                error!("Payment gateway error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "The payment provider could not be reached. Please try again.",
                        "redirect": "payment_option"
                    }),
                )
            }
            AppError::FinalizationConflict { intent_id, draft_token, date, reason } => {
                error!(
                    operator_action = "required",
                    intent_id = %intent_id,
                    draft_token = ?draft_token,
                    date = ?date,
                    "Finalization conflict: {}", reason
                );
                (
                    StatusCode::CONFLICT,
                    json!({
                        "error": "Payment received but the booking could not be confirmed. Our team has been notified.",
                        "kind": "finalization_conflict"
                    }),
                )
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" })),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}
