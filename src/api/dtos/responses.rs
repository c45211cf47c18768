use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use crate::domain::models::draft::{DraftReservation, DraftStep, ResolvedPayment};
use crate::domain::models::refund::RefundCalculationRecord;
use crate::domain::services::refund::RefundOutcome;

#[derive(Serialize)]
pub struct StepResponse {
    pub token: String,
    pub next_step: DraftStep,
}

impl From<&DraftReservation> for StepResponse {
    fn from(draft: &DraftReservation) -> Self {
        Self { token: draft.token.clone(), next_step: draft.next_step() }
    }
}

#[derive(Serialize)]
pub struct DraftView {
    pub token: String,
    pub service_type_id: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub total_amount: i64,
    pub deposit_amount: Option<i64>,
    pub item_id: Option<String>,
    pub profile_id: Option<String>,
    pub payment: Option<ResolvedPayment>,
    pub customer_notes: Option<String>,
    pub next_step: DraftStep,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<DraftReservation> for DraftView {
    fn from(draft: DraftReservation) -> Self {
        let next_step = draft.next_step();
        let payment = draft.payment();
        Self {
            token: draft.token,
            service_type_id: draft.service_type_id,
            service_name: draft.service_name,
            booking_date: draft.booking_date,
            total_amount: draft.total_amount,
            deposit_amount: draft.deposit_amount,
            item_id: draft.item_id,
            profile_id: draft.profile_id,
            payment,
            customer_notes: draft.customer_notes,
            next_step,
            expires_at: draft.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct RefundCalculationResponse {
    pub reference: String,
    pub final_amount: i64,
    pub calculation: RefundOutcome,
    pub record: RefundCalculationRecord,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
}
