use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{availability, drafts, health, payments, refunds, webhooks};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        .route("/api/v1/availability", get(availability::get_availability))

        // Draft steps
        .route("/api/v1/drafts", post(drafts::create_draft))
        .route("/api/v1/drafts/{token}", get(drafts::get_draft).delete(drafts::discard_draft))
        .route("/api/v1/drafts/{token}/selection", put(drafts::update_selection))
        .route("/api/v1/drafts/{token}/item", put(drafts::attach_item))
        .route("/api/v1/drafts/{token}/profile", put(drafts::attach_profile))
        .route("/api/v1/drafts/{token}/payment-option", put(drafts::choose_payment_option))
        .route("/api/v1/drafts/{token}/payment", post(drafts::enter_payment))
        .route("/api/v1/drafts/{token}/confirm-in-store", post(drafts::confirm_in_store))

        // Payments
        .route("/api/v1/payments/callback", post(payments::payment_callback))
        .route("/api/v1/payments/status", get(payments::payment_status))
        .route("/api/v1/webhooks/gateway", post(webhooks::gateway_webhook))

        .route("/api/v1/bookings/{reference}/refund-calculation", post(refunds::calculate_refund))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = %request.uri().path(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
