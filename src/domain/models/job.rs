use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const JOB_BOOKING_CONFIRMED: &str = "BOOKING_CONFIRMED";
pub const JOB_FINALIZATION_CONFLICT: &str = "FINALIZATION_CONFLICT";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JobPayload {
    pub booking_id: Option<String>,
    pub intent_id: Option<String>,
    pub draft_token: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub detail: Option<String>,
}

/// Outbox row consumed by the background notifier.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Job {
    pub id: String,
    pub job_type: String,
    /// Unique per logical event; repeated deliveries never queue twice.
    pub dedupe_key: String,
    pub payload: Json<JobPayload>,
    pub execute_at: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: &str, dedupe_key: String, payload: JobPayload, execute_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            dedupe_key,
            payload: Json(payload),
            execute_at,
            status: "PENDING".to_string(),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn booking_confirmed(booking_id: &str) -> Self {
        Self::new(
            JOB_BOOKING_CONFIRMED,
            format!("confirmed:{}", booking_id),
            JobPayload { booking_id: Some(booking_id.to_string()), ..Default::default() },
            Utc::now(),
        )
    }

    /// One alert per captured payment, however often the gateway redelivers.
    pub fn finalization_conflict(
        intent_id: &str,
        draft_token: Option<&str>,
        date: Option<NaiveDate>,
        detail: String,
    ) -> Self {
        Self::new(
            JOB_FINALIZATION_CONFLICT,
            format!("conflict:{}", intent_id),
            JobPayload {
                intent_id: Some(intent_id.to_string()),
                draft_token: draft_token.map(str::to_string),
                booking_date: date,
                detail: Some(detail),
                ..Default::default()
            },
            Utc::now(),
        )
    }
}
