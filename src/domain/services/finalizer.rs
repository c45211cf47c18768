use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};
use crate::config::BookingSettings;
use crate::domain::models::booking::{BookingSummary, FinalizedBooking};
use crate::domain::models::draft::{DraftReservation, ResolvedPayment};
use crate::domain::models::job::Job;
use crate::domain::models::payment::PaymentIntentRecord;
use crate::domain::ports::{
    BookingRepository, CapacityGuard, DraftRepository, FinalizeDraft, FinalizeResult, JobRepository,
    PaymentRepository,
};
use crate::domain::services::reference::allocate_reference;
use crate::error::AppError;

const MAX_INSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub enum FinalizeRequest {
    /// Gateway confirmed payment for this intent.
    Online(String),
    /// Customer chose to pay at the counter; carries the draft token.
    InStore(String),
}

#[derive(Debug)]
pub enum FinalizeOutcome {
    Created(FinalizedBooking),
    /// Duplicate delivery. The booking is returned when it can be located.
    AlreadyFinalized(Option<FinalizedBooking>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusCheck {
    Ready(BookingSummary),
    Processing,
    Error,
}

/// Converts a paid (or in-store) draft into an immutable booking exactly once.
pub struct BookingFinalizer {
    settings: Arc<BookingSettings>,
    draft_repo: Arc<dyn DraftRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    job_repo: Arc<dyn JobRepository>,
}

impl BookingFinalizer {
    pub fn new(
        settings: Arc<BookingSettings>,
        draft_repo: Arc<dyn DraftRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        job_repo: Arc<dyn JobRepository>,
    ) -> Self {
        Self { settings, draft_repo, payment_repo, booking_repo, job_repo }
    }

    pub async fn finalize(&self, request: FinalizeRequest) -> Result<FinalizeOutcome, AppError> {
        match request {
            FinalizeRequest::Online(intent_id) => self.finalize_online(&intent_id).await,
            FinalizeRequest::InStore(token) => self.finalize_in_store(&token).await,
        }
    }

    async fn finalize_online(&self, intent_id: &str) -> Result<FinalizeOutcome, AppError> {
        let record = match self.payment_repo.find_by_intent_id(intent_id).await? {
            Some(record) => record,
            None => {
                return match self.booking_repo.find_by_intent_id(intent_id).await? {
                    Some(booking) => Ok(FinalizeOutcome::AlreadyFinalized(Some(booking))),
                    None => Err(AppError::NotFound(format!("Unknown payment intent {}", intent_id))),
                };
            }
        };

        let draft = match (&record.booking_id, &record.draft_token) {
            (None, Some(token)) => self.draft_repo.find_by_token(token).await?,
            _ => None,
        };
        let Some(draft) = draft else {
            // Only a booking carrying this intent proves the payment was already honoured.
            if let Some(booking) = self.booking_repo.find_by_intent_id(intent_id).await? {
                info!(intent_id, reference = %booking.reference, "Draft already finalized, nothing to do");
                return Ok(FinalizeOutcome::AlreadyFinalized(Some(booking)));
            }
            let reason = "payment succeeded but no reservation or booking holds it".to_string();
            return Err(self.report_conflict(intent_id, record.draft_token.as_deref(), None, reason).await?);
        };

        let payment = paid_online(&draft, &record);
        match self.commit(&draft, payment, Some(&record)).await? {
            Commit::Done(FinalizeOutcome::AlreadyFinalized(None)) => {
                let reason = "reservation was removed while its payment was being finalized".to_string();
                Err(self.report_conflict(intent_id, Some(&draft.token), Some(draft.booking_date), reason).await?)
            }
            Commit::Done(outcome) => Ok(outcome),
            Commit::OverCapacity { booked, limit } => {
                let reason = format!("capacity exceeded on {} ({} of {} booked)", draft.booking_date, booked, limit);
                Err(self.report_conflict(intent_id, Some(&draft.token), Some(draft.booking_date), reason).await?)
            }
        }
    }

    /// Queues the operator alert and builds the error the webhook answers with.
    async fn report_conflict(
        &self,
        intent_id: &str,
        draft_token: Option<&str>,
        date: Option<NaiveDate>,
        reason: String,
    ) -> Result<AppError, AppError> {
        let alert = Job::finalization_conflict(intent_id, draft_token, date, reason.clone());
        if !self.job_repo.create(&alert).await? {
            warn!(intent_id, "Finalization conflict already reported");
        }
        Ok(AppError::FinalizationConflict {
            intent_id: intent_id.to_string(),
            draft_token: draft_token.map(str::to_string),
            date,
            reason,
        })
    }

    async fn finalize_in_store(&self, token: &str) -> Result<FinalizeOutcome, AppError> {
        let draft = self.draft_repo.find_by_token(token).await?
            .filter(|d| !d.is_expired(chrono::Utc::now()))
            .ok_or_else(|| AppError::NotFound("Reservation not found or expired".into()))?;

        if draft.payment() != Some(ResolvedPayment::InStore) {
            return Err(AppError::Validation("Reservation is not set up for in-store payment".into()));
        }
        if draft.item_id.is_none() || draft.profile_id.is_none() {
            return Err(AppError::Validation(format!(
                "Reservation is incomplete, continue at the {} step",
                draft.next_step().as_str()
            )));
        }

        match self.commit(&draft, ResolvedPayment::InStore, None).await? {
            Commit::Done(outcome) => Ok(outcome),
            // No money has moved, so the customer can simply pick another date.
            Commit::OverCapacity { .. } => Err(AppError::StaleSelection(
                "This date is fully booked. Please choose another date.".into(),
            )),
        }
    }

    async fn commit(
        &self,
        draft: &DraftReservation,
        payment: ResolvedPayment,
        record: Option<&PaymentIntentRecord>,
    ) -> Result<Commit, AppError> {
        let capacity = CapacityGuard {
            limit: self.settings.availability.as_ref().and_then(|r| r.capacity_limit()),
            counted_statuses: self.settings.counted_statuses.clone(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let repo = self.booking_repo.clone();
            let reference = allocate_reference(&self.settings.reference_prefix, |code| {
                let repo = repo.clone();
                async move { repo.reference_exists(&code).await }
            })
            .await?;

            let booking = FinalizedBooking::from_draft(
                draft,
                payment,
                record,
                reference,
                &self.settings.currency,
                &self.settings.refund_policy,
            );
            let request = FinalizeDraft {
                draft_token: draft.token.clone(),
                notification: Job::booking_confirmed(&booking.id),
                booking,
                capacity: capacity.clone(),
            };

            match self.booking_repo.finalize_draft(&request).await {
                Ok(FinalizeResult::Created(booking)) => {
                    info!(
                        reference = %booking.reference,
                        date = %booking.booking_date,
                        payment_status = %booking.payment_status,
                        "Booking finalized"
                    );
                    return Ok(Commit::Done(FinalizeOutcome::Created(booking)));
                }
                Ok(FinalizeResult::DraftMissing) => {
                    info!("Draft consumed by a concurrent delivery");
                    let booking = match record {
                        Some(r) => self.booking_repo.find_by_intent_id(&r.intent_id).await?,
                        None => None,
                    };
                    return Ok(Commit::Done(FinalizeOutcome::AlreadyFinalized(booking)));
                }
                Ok(FinalizeResult::CapacityExceeded { booked, limit }) => {
                    error!(date = %draft.booking_date, booked, limit, "Capacity exceeded at finalization");
                    return Ok(Commit::OverCapacity { booked, limit });
                }
                // A reference taken between the check and the insert.
                Err(e) if e.is_unique_violation() && attempt < MAX_INSERT_ATTEMPTS => {
                    warn!(attempt, "Unique violation while finalizing, retrying with a new reference");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polling endpoint for clients waiting on the webhook.
    pub async fn status_check(&self, intent_id: &str) -> Result<StatusCheck, AppError> {
        if let Some(booking) = self.booking_repo.find_by_intent_id(intent_id).await? {
            return Ok(StatusCheck::Ready(booking.summary()));
        }
        let draft_token = self.payment_repo.find_by_intent_id(intent_id).await?
            .and_then(|record| record.draft_token);
        if let Some(token) = draft_token
            && self.draft_repo.find_by_token(&token).await?.is_some() {
            return Ok(StatusCheck::Processing);
        }
        Ok(StatusCheck::Error)
    }
}

enum Commit {
    Done(FinalizeOutcome),
    OverCapacity { booked: i64, limit: i64 },
}

/// Status follows what was actually captured, not what the draft last asked for.
fn paid_online(draft: &DraftReservation, record: &PaymentIntentRecord) -> ResolvedPayment {
    if record.amount >= draft.total_amount {
        ResolvedPayment::FullOnline { amount: record.amount }
    } else {
        ResolvedPayment::DepositOnline { amount: record.amount }
    }
}
