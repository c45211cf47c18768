use crate::domain::{models::availability::BlockedPeriod, ports::BlockedPeriodRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

pub struct PostgresBlockedPeriodRepo {
    pool: PgPool,
}

impl PostgresBlockedPeriodRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl BlockedPeriodRepository for PostgresBlockedPeriodRepo {
    async fn create(&self, period: &BlockedPeriod) -> Result<BlockedPeriod, AppError> {
        sqlx::query_as::<_, BlockedPeriod>(
            "INSERT INTO blocked_periods (id, start_date, end_date, reason, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *"
        )
            .bind(&period.id).bind(period.start_date).bind(period.end_date).bind(&period.reason).bind(period.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_overlapping(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BlockedPeriod>, AppError> {
        sqlx::query_as::<_, BlockedPeriod>(
            "SELECT * FROM blocked_periods WHERE start_date <= $1 AND end_date >= $2 ORDER BY start_date ASC"
        )
            .bind(end).bind(start)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
