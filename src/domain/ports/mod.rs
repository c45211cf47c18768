use crate::domain::models::{
    availability::BlockedPeriod, booking::{BookingStatus, FinalizedBooking}, catalog::ServiceType,
    draft::DraftReservation, job::Job, payment::{GatewayIntent, IntentMetadata, PaymentIntentRecord},
    profile::{CustomerItem, CustomerProfile}, refund::RefundCalculationRecord,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create(&self, service: &ServiceType) -> Result<ServiceType, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceType>, AppError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn create_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError>;
    async fn update_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError>;
    async fn find_profile(&self, id: &str) -> Result<Option<CustomerProfile>, AppError>;
    async fn find_profile_by_user(&self, user_id: &str) -> Result<Option<CustomerProfile>, AppError>;

    async fn create_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError>;
    async fn update_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError>;
    async fn find_item(&self, id: &str) -> Result<Option<CustomerItem>, AppError>;
    /// Moves an item to another profile. An item belongs to one profile at a time.
    async fn reassign_item(&self, item_id: &str, profile_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait BlockedPeriodRepository: Send + Sync {
    async fn create(&self, period: &BlockedPeriod) -> Result<BlockedPeriod, AppError>;
    async fn list_overlapping(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BlockedPeriod>, AppError>;
}

#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn create(&self, draft: &DraftReservation) -> Result<DraftReservation, AppError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<DraftReservation>, AppError>;
    async fn update(&self, draft: &DraftReservation) -> Result<DraftReservation, AppError>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, token: &str) -> Result<bool, AppError>;
    /// Removes expired drafts that have no payment record attached.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, record: &PaymentIntentRecord) -> Result<PaymentIntentRecord, AppError>;
    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<PaymentIntentRecord>, AppError>;
    async fn find_by_draft(&self, draft_token: &str) -> Result<Option<PaymentIntentRecord>, AppError>;
    async fn update(&self, record: &PaymentIntentRecord) -> Result<PaymentIntentRecord, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Last-gate capacity check applied inside the finalize transaction.
#[derive(Debug, Clone)]
pub struct CapacityGuard {
    pub limit: Option<i64>,
    pub counted_statuses: Vec<BookingStatus>,
}

impl CapacityGuard {
    pub fn admits(&self, booked: i64) -> bool {
        match self.limit.filter(|l| *l > 0) {
            Some(limit) => booked < limit,
            None => true,
        }
    }

    pub fn status_strings(&self) -> Vec<&'static str> {
        self.counted_statuses.iter().map(|s| s.as_str()).collect()
    }
}

/// Everything the atomic finalize unit writes.
#[derive(Debug, Clone)]
pub struct FinalizeDraft {
    pub draft_token: String,
    pub booking: FinalizedBooking,
    pub capacity: CapacityGuard,
    pub notification: Job,
}

#[derive(Debug)]
pub enum FinalizeResult {
    Created(FinalizedBooking),
    /// The draft was already consumed by an earlier delivery.
    DraftMissing,
    CapacityExceeded { booked: i64, limit: i64 },
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<FinalizedBooking>, AppError>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<FinalizedBooking>, AppError>;
    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<FinalizedBooking>, AppError>;
    async fn reference_exists(&self, reference: &str) -> Result<bool, AppError>;
    /// Counted bookings per date in `[start, end]`. Dates with no bookings are absent.
    async fn count_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<HashMap<NaiveDate, i64>, AppError>;
    /// Deletes the draft, re-checks capacity, inserts the booking, relinks the payment
    /// record and queues the notification in one transaction.
    async fn finalize_draft(&self, request: &FinalizeDraft) -> Result<FinalizeResult, AppError>;
}

#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn create(&self, record: &RefundCalculationRecord) -> Result<RefundCalculationRecord, AppError>;
    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<RefundCalculationRecord>, AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Returns false when a job with the same dedupe key already exists.
    async fn create(&self, job: &Job) -> Result<bool, AppError>;
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount: i64, currency: &str, metadata: &IntentMetadata) -> Result<GatewayIntent, AppError>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError>;
    async fn update_intent(
        &self,
        intent_id: &str,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, AppError>;
    /// Fails once the intent has succeeded.
    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
