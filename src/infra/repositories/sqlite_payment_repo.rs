use crate::domain::{models::payment::PaymentIntentRecord, ports::PaymentRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SqlitePaymentRepo {
    pool: SqlitePool,
}

impl SqlitePaymentRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepo {
    async fn create(&self, record: &PaymentIntentRecord) -> Result<PaymentIntentRecord, AppError> {
        sqlx::query_as::<_, PaymentIntentRecord>(
            "INSERT INTO payment_intents (id, intent_id, draft_token, booking_id, profile_id, amount, currency, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&record.id).bind(&record.intent_id).bind(&record.draft_token).bind(&record.booking_id)
            .bind(&record.profile_id).bind(record.amount).bind(&record.currency).bind(&record.status)
            .bind(record.created_at).bind(record.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<PaymentIntentRecord>, AppError> {
        sqlx::query_as::<_, PaymentIntentRecord>("SELECT * FROM payment_intents WHERE intent_id = ?")
            .bind(intent_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_draft(&self, draft_token: &str) -> Result<Option<PaymentIntentRecord>, AppError> {
        sqlx::query_as::<_, PaymentIntentRecord>("SELECT * FROM payment_intents WHERE draft_token = ?")
            .bind(draft_token).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, record: &PaymentIntentRecord) -> Result<PaymentIntentRecord, AppError> {
        sqlx::query_as::<_, PaymentIntentRecord>(
            "UPDATE payment_intents SET amount = ?, currency = ?, status = ?, profile_id = ?, updated_at = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(record.amount).bind(&record.currency).bind(&record.status).bind(&record.profile_id)
            .bind(Utc::now()).bind(&record.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM payment_intents WHERE id = ?")
            .bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
