use crate::domain::{models::profile::{CustomerItem, CustomerProfile}, ports::ProfileRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresProfileRepo {
    pool: PgPool,
}

impl PostgresProfileRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepo {
    async fn create_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError> {
        sqlx::query_as::<_, CustomerProfile>(
            "INSERT INTO customer_profiles (id, user_id, name, email, phone, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"
        )
            .bind(&profile.id).bind(&profile.user_id).bind(&profile.name).bind(&profile.email)
            .bind(&profile.phone).bind(profile.created_at).bind(profile.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError> {
        sqlx::query_as::<_, CustomerProfile>(
            "UPDATE customer_profiles SET name = $1, email = $2, phone = $3, updated_at = $4 WHERE id = $5 RETURNING *"
        )
            .bind(&profile.name).bind(&profile.email).bind(&profile.phone).bind(profile.updated_at)
            .bind(&profile.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_profile(&self, id: &str) -> Result<Option<CustomerProfile>, AppError> {
        sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customer_profiles WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_profile_by_user(&self, user_id: &str) -> Result<Option<CustomerProfile>, AppError> {
        sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customer_profiles WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn create_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError> {
        sqlx::query_as::<_, CustomerItem>(
            "INSERT INTO customer_items (id, profile_id, make, model, year, registration, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"
        )
            .bind(&item.id).bind(&item.profile_id).bind(&item.make).bind(&item.model)
            .bind(item.year).bind(&item.registration).bind(item.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError> {
        sqlx::query_as::<_, CustomerItem>(
            "UPDATE customer_items SET make = $1, model = $2, year = $3, registration = $4 WHERE id = $5 RETURNING *"
        )
            .bind(&item.make).bind(&item.model).bind(item.year).bind(&item.registration)
            .bind(&item.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_item(&self, id: &str) -> Result<Option<CustomerItem>, AppError> {
        sqlx::query_as::<_, CustomerItem>("SELECT * FROM customer_items WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn reassign_item(&self, item_id: &str, profile_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE customer_items SET profile_id = $1 WHERE id = $2")
            .bind(profile_id).bind(item_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Item not found".into())); }
        Ok(())
    }
}
