use crate::domain::{models::draft::DraftReservation, ports::DraftRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresDraftRepo {
    pool: PgPool,
}

impl PostgresDraftRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl DraftRepository for PostgresDraftRepo {
    async fn create(&self, draft: &DraftReservation) -> Result<DraftReservation, AppError> {
        sqlx::query_as::<_, DraftReservation>(
            "INSERT INTO draft_reservations (token, service_type_id, service_name, booking_date, total_amount, deposit_amount, item_id, profile_id, payment_option, payment_amount, customer_notes, created_at, updated_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *"
        )
            .bind(&draft.token).bind(&draft.service_type_id).bind(&draft.service_name).bind(draft.booking_date)
            .bind(draft.total_amount).bind(draft.deposit_amount).bind(&draft.item_id).bind(&draft.profile_id)
            .bind(&draft.payment_option).bind(draft.payment_amount).bind(&draft.customer_notes)
            .bind(draft.created_at).bind(draft.updated_at).bind(draft.expires_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<DraftReservation>, AppError> {
        sqlx::query_as::<_, DraftReservation>("SELECT * FROM draft_reservations WHERE token = $1")
            .bind(token).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, draft: &DraftReservation) -> Result<DraftReservation, AppError> {
        sqlx::query_as::<_, DraftReservation>(
            "UPDATE draft_reservations SET service_type_id = $1, service_name = $2, booking_date = $3, total_amount = $4, deposit_amount = $5,
                item_id = $6, profile_id = $7, payment_option = $8, payment_amount = $9, customer_notes = $10, updated_at = $11, expires_at = $12
             WHERE token = $13
             RETURNING *"
        )
            .bind(&draft.service_type_id).bind(&draft.service_name).bind(draft.booking_date).bind(draft.total_amount)
            .bind(draft.deposit_amount).bind(&draft.item_id).bind(&draft.profile_id).bind(&draft.payment_option)
            .bind(draft.payment_amount).bind(&draft.customer_notes).bind(draft.updated_at).bind(draft.expires_at)
            .bind(&draft.token)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Reservation not found or expired".into()))
    }

    async fn delete(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM draft_reservations WHERE token = $1")
            .bind(token).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM draft_reservations
             WHERE expires_at IS NOT NULL AND expires_at <= $1
             AND token NOT IN (SELECT draft_token FROM payment_intents WHERE draft_token IS NOT NULL)"
        )
            .bind(now)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
