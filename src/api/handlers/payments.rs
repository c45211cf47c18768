use axum::{extract::{State, Query}, response::IntoResponse, Json};
use crate::api::dtos::requests::{PaymentCallbackRequest, PaymentStatusQuery};
use crate::state::AppState;
use crate::error::{AppError, FieldError};
use std::sync::Arc;

fn require_intent_id(intent_id: &str) -> Result<&str, AppError> {
    let trimmed = intent_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidFields(vec![FieldError::new("intent_id", "This field is required")]));
    }
    Ok(trimmed)
}

/// Browser-reported outcome after card confirmation. Reports status only.
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentCallbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let intent_id = require_intent_id(&payload.intent_id)?;
    let outcome = state.payments.client_callback(intent_id).await?;
    Ok(Json(outcome))
}

pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let intent_id = require_intent_id(&query.intent_id)?;
    let status = state.finalizer.status_check(intent_id).await?;
    Ok(Json(status))
}
