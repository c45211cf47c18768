use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use crate::domain::models::draft::{DraftReservation, ResolvedPayment};
use crate::domain::models::payment::PaymentIntentRecord;
use crate::domain::models::refund::RefundPolicy;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Declined,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Declined => "declined",
            BookingStatus::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    DepositPaid,
    PayInStore,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::DepositPaid => "deposit_paid",
            PaymentStatus::PayInStore => "pay_in_store",
        }
    }
}

/// Committed booking. Never mutated by the reservation engine after insert.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct FinalizedBooking {
    pub id: String,
    pub reference: String,
    pub service_type_id: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub item_id: Option<String>,
    pub profile_id: Option<String>,
    pub customer_notes: Option<String>,
    pub payment_option: String,
    pub total_amount: i64,
    pub amount_paid: i64,
    pub currency: String,
    pub payment_status: String,
    pub status: String,
    pub payment_intent_id: Option<String>,
    /// Refund terms in force when the booking was paid. Later settings changes do not apply.
    pub refund_policy: Json<RefundPolicy>,
    pub created_at: DateTime<Utc>,
}

impl FinalizedBooking {
    pub fn from_draft(
        draft: &DraftReservation,
        payment: ResolvedPayment,
        intent: Option<&PaymentIntentRecord>,
        reference: String,
        currency: &str,
        refund_policy: &RefundPolicy,
    ) -> Self {
        let (status, payment_status) = match payment {
            ResolvedPayment::FullOnline { .. } => (BookingStatus::Confirmed, PaymentStatus::Paid),
            ResolvedPayment::DepositOnline { .. } => (BookingStatus::Confirmed, PaymentStatus::DepositPaid),
            ResolvedPayment::InStore => (BookingStatus::Pending, PaymentStatus::PayInStore),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            reference,
            service_type_id: draft.service_type_id.clone(),
            service_name: draft.service_name.clone(),
            booking_date: draft.booking_date,
            item_id: draft.item_id.clone(),
            profile_id: draft.profile_id.clone(),
            customer_notes: draft.customer_notes.clone(),
            payment_option: payment.option().as_str().to_string(),
            total_amount: draft.total_amount,
            amount_paid: intent.map(|i| i.amount).unwrap_or(0),
            currency: intent.map(|i| i.currency.clone()).unwrap_or_else(|| currency.to_string()),
            payment_status: payment_status.as_str().to_string(),
            status: status.as_str().to_string(),
            payment_intent_id: intent.map(|i| i.intent_id.clone()),
            refund_policy: Json(refund_policy.clone()),
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> BookingSummary {
        BookingSummary {
            reference: self.reference.clone(),
            service_name: self.service_name.clone(),
            booking_date: self.booking_date,
            status: self.status.clone(),
            payment_status: self.payment_status.clone(),
            amount_paid: self.amount_paid,
            total_amount: self.total_amount,
            currency: self.currency.clone(),
        }
    }
}

/// Customer-facing view; never exposes internal ids.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingSummary {
    pub reference: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub status: String,
    pub payment_status: String,
    pub amount_paid: i64,
    pub total_amount: i64,
    pub currency: String,
}
