use crate::domain::{models::refund::RefundCalculationRecord, ports::RefundRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteRefundRepo {
    pool: SqlitePool,
}

impl SqliteRefundRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl RefundRepository for SqliteRefundRepo {
    async fn create(&self, record: &RefundCalculationRecord) -> Result<RefundCalculationRecord, AppError> {
        sqlx::query_as::<_, RefundCalculationRecord>(
            "INSERT INTO refund_calculations (id, booking_id, initiated_by, policy_version, payment_type, days_before, amount_paid, matched_tier_days, percentage_bps, amount_before_fees, fee_deducted, final_amount, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&record.id).bind(&record.booking_id).bind(&record.initiated_by).bind(&record.policy_version)
            .bind(&record.payment_type).bind(record.days_before).bind(record.amount_paid).bind(record.matched_tier_days)
            .bind(record.percentage_bps).bind(record.amount_before_fees).bind(record.fee_deducted).bind(record.final_amount)
            .bind(record.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<RefundCalculationRecord>, AppError> {
        sqlx::query_as::<_, RefundCalculationRecord>(
            "SELECT * FROM refund_calculations WHERE booking_id = ? ORDER BY created_at ASC"
        )
            .bind(booking_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
