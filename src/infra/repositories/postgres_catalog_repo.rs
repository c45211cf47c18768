use crate::domain::{models::catalog::ServiceType, ports::CatalogRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCatalogRepo {
    pool: PgPool,
}

impl PostgresCatalogRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepo {
    async fn create(&self, service: &ServiceType) -> Result<ServiceType, AppError> {
        sqlx::query_as::<_, ServiceType>(
            "INSERT INTO service_types (id, name, description, base_price, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"
        )
            .bind(&service.id)
            .bind(&service.name)
            .bind(&service.description)
            .bind(service.base_price)
            .bind(service.is_active)
            .bind(service.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceType>, AppError> {
        sqlx::query_as::<_, ServiceType>("SELECT * FROM service_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
