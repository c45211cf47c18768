use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let today = state.availability.today();
    let snapshot = state.availability.snapshot(today).await?;
    Ok(Json(snapshot))
}
