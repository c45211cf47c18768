use axum::{body::Bytes, extract::{State, Path}, response::IntoResponse, Json};
use chrono::Utc;
use crate::api::dtos::requests::RefundCalculationRequest;
use crate::api::dtos::responses::RefundCalculationResponse;
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::refund::RefundInitiator;
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

pub async fn calculate_refund(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(reference): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.repos.bookings.find_by_reference(&reference).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let initiator = if identity.is_admin() {
        RefundInitiator::Admin
    } else {
        let owner = match &booking.profile_id {
            Some(id) => state.repos.profiles.find_profile(id).await?.and_then(|p| p.user_id),
            None => None,
        };
        if owner.as_deref() != Some(identity.user_id.as_str()) {
            return Err(AppError::Forbidden("You cannot request a refund for this booking".into()));
        }
        RefundInitiator::Customer
    };

    // The body is optional; an empty one means a domestic card.
    let request: RefundCalculationRequest = if body.is_empty() {
        RefundCalculationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };
    let (calculation, record) = state.refunds
        .calculate_for_booking(&booking, initiator, request.international, Utc::now())
        .await?;

    Ok(Json(RefundCalculationResponse {
        reference: booking.reference,
        final_amount: calculation.final_amount,
        calculation,
        record,
    }))
}
