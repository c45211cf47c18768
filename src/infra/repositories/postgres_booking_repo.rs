use crate::domain::models::booking::{BookingStatus, FinalizedBooking};
use crate::domain::ports::{BookingRepository, FinalizeDraft, FinalizeResult};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, PgPool, Postgres, Row};
use std::collections::HashMap;

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_status_list<'a>(builder: &mut QueryBuilder<'a, Postgres>, statuses: &[&'static str]) {
    builder.push(" AND status IN (");
    let mut separated = builder.separated(", ");
    for status in statuses {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<FinalizedBooking>, AppError> {
        sqlx::query_as::<_, FinalizedBooking>("SELECT * FROM bookings WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<FinalizedBooking>, AppError> {
        sqlx::query_as::<_, FinalizedBooking>("SELECT * FROM bookings WHERE reference = $1").bind(reference).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<FinalizedBooking>, AppError> {
        sqlx::query_as::<_, FinalizedBooking>("SELECT * FROM bookings WHERE payment_intent_id = $1").bind(intent_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM bookings WHERE reference = $1")
            .bind(reference).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        let count: i64 = row.try_get("cnt").map_err(AppError::Database)?;
        Ok(count > 0)
    }

    async fn count_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<HashMap<NaiveDate, i64>, AppError> {
        if statuses.is_empty() {
            return Ok(HashMap::new());
        }
        let names: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT booking_date, COUNT(*) AS cnt FROM bookings WHERE booking_date >= ");
        builder.push_bind(start).push(" AND booking_date <= ").push_bind(end);
        push_status_list(&mut builder, &names);
        builder.push(" GROUP BY booking_date");

        let rows = builder.build().fetch_all(&self.pool).await.map_err(AppError::Database)?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let date: NaiveDate = row.try_get("booking_date").map_err(AppError::Database)?;
            let count: i64 = row.try_get("cnt").map_err(AppError::Database)?;
            counts.insert(date, count);
        }
        Ok(counts)
    }

    async fn finalize_draft(&self, request: &FinalizeDraft) -> Result<FinalizeResult, AppError> {
        let booking = &request.booking;
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Serializes finalizers for the same date so the capacity count below cannot go stale.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(booking.booking_date.to_string())
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let deleted = sqlx::query("DELETE FROM draft_reservations WHERE token = $1")
            .bind(&request.draft_token).execute(&mut *tx).await.map_err(AppError::Database)?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::Database)?;
            return Ok(FinalizeResult::DraftMissing);
        }

        if let Some(limit) = request.capacity.limit.filter(|l| *l > 0) {
            let names = request.capacity.status_strings();
            let booked = if names.is_empty() {
                0
            } else {
                let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS cnt FROM bookings WHERE booking_date = ");
                builder.push_bind(booking.booking_date);
                push_status_list(&mut builder, &names);
                let row = builder.build().fetch_one(&mut *tx).await.map_err(AppError::Database)?;
                row.try_get::<i64, _>("cnt").map_err(AppError::Database)?
            };
            if !request.capacity.admits(booked) {
                tx.rollback().await.map_err(AppError::Database)?;
                return Ok(FinalizeResult::CapacityExceeded { booked, limit });
            }
        }

        let created = sqlx::query_as::<_, FinalizedBooking>(
            "INSERT INTO bookings (id, reference, service_type_id, service_name, booking_date, item_id, profile_id, customer_notes, payment_option, total_amount, amount_paid, currency, payment_status, status, payment_intent_id, refund_policy, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.reference).bind(&booking.service_type_id).bind(&booking.service_name)
            .bind(booking.booking_date).bind(&booking.item_id).bind(&booking.profile_id).bind(&booking.customer_notes)
            .bind(&booking.payment_option).bind(booking.total_amount).bind(booking.amount_paid).bind(&booking.currency)
            .bind(&booking.payment_status).bind(&booking.status).bind(&booking.payment_intent_id).bind(&booking.refund_policy).bind(booking.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        if let Some(intent_id) = &created.payment_intent_id {
            sqlx::query("UPDATE payment_intents SET booking_id = $1, draft_token = NULL, updated_at = $2 WHERE intent_id = $3")
                .bind(&created.id).bind(Utc::now()).bind(intent_id)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        let job = &request.notification;
        sqlx::query(
            "INSERT INTO jobs (id, job_type, dedupe_key, payload, execute_at, status, error_message, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT(dedupe_key) DO NOTHING"
        )
            .bind(&job.id).bind(&job.job_type).bind(&job.dedupe_key).bind(&job.payload)
            .bind(job.execute_at).bind(&job.status).bind(&job.error_message).bind(job.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(FinalizeResult::Created(created))
    }
}
