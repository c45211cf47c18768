use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use chrono::Utc;
use crate::api::dtos::requests::GatewayEvent;
use crate::api::dtos::responses::WebhookAck;
use crate::domain::services::finalizer::FinalizeOutcome;
use crate::domain::services::payment_service::WebhookOutcome;
use crate::infra::gateway::webhook_signature;
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

pub async fn gateway_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if let Some(secret) = &state.config.gateway_webhook_secret {
        let header = headers.get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Validation("Missing webhook signature".into()))?;
        webhook_signature::verify(header, &body, secret, Utc::now()).map_err(|e| {
            warn!(error = ?e, "Webhook signature rejected");
            AppError::Validation("Invalid webhook signature".into())
        })?;
    }

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;

    if event.event_type != EVENT_PAYMENT_SUCCEEDED {
        info!(event_type = %event.event_type, "Webhook event ignored");
        return Ok(Json(WebhookAck { received: true, outcome: Some("ignored") }));
    }

    info!(event_id = ?event.id, intent_id = %event.data.object.id, "Payment succeeded webhook received");
    let outcome = match state.payments.webhook_succeeded(&event.data.object.id).await? {
        WebhookOutcome::Finalized(FinalizeOutcome::Created(_)) => "finalized",
        WebhookOutcome::Finalized(FinalizeOutcome::AlreadyFinalized(_)) => "already_finalized",
        WebhookOutcome::Ignored => "ignored",
    };
    Ok(Json(WebhookAck { received: true, outcome: Some(outcome) }))
}
