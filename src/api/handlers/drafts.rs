use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::requests::{ItemRequest, PaymentOptionRequest, ProfileRequest, SelectionRequest};
use crate::api::dtos::responses::{DraftView, StepResponse};
use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::domain::services::finalizer::FinalizeOutcome;
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let selection = payload.validate()?;
    let draft = state.drafts.create(selection).await?;
    Ok((StatusCode::CREATED, Json(StepResponse::from(&draft))))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state.drafts.load(&token).await?;
    Ok(Json(DraftView::from(draft)))
}

pub async fn update_selection(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<SelectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let selection = payload.validate()?;
    let draft = state.drafts.update_selection(&token, selection).await?;
    Ok(Json(StepResponse::from(&draft)))
}

pub async fn attach_item(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let details = payload.validate()?;
    let draft = state.drafts.attach_item(&token, details).await?;
    Ok(Json(StepResponse::from(&draft)))
}

pub async fn attach_profile(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(actor): MaybeAuthUser,
    Path(token): Path<String>,
    Json(payload): Json<ProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let details = payload.validate()?;
    let draft = state.drafts.attach_profile(&token, details, actor.as_ref()).await?;
    Ok(Json(StepResponse::from(&draft)))
}

pub async fn choose_payment_option(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<PaymentOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let option = payload.validate()?;
    let draft = state.drafts.choose_payment_option(&token, option).await?;
    Ok(Json(StepResponse::from(&draft)))
}

pub async fn discard_draft(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.payments.discard_draft(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enter_payment(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.payments.enter_payment(&token).await?;
    Ok(Json(entry))
}

pub async fn confirm_in_store(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.payments.confirm_in_store(&token).await? {
        FinalizeOutcome::Created(booking) => Ok((StatusCode::CREATED, Json(booking.summary()))),
        FinalizeOutcome::AlreadyFinalized(Some(booking)) => Ok((StatusCode::OK, Json(booking.summary()))),
        FinalizeOutcome::AlreadyFinalized(None) => Err(AppError::NotFound("Reservation not found or expired".into())),
    }
}
