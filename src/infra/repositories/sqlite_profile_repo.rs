use crate::domain::{models::profile::{CustomerItem, CustomerProfile}, ports::ProfileRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteProfileRepo {
    pool: SqlitePool,
}

impl SqliteProfileRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepo {
    async fn create_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError> {
        sqlx::query_as::<_, CustomerProfile>(
            "INSERT INTO customer_profiles (id, user_id, name, email, phone, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&profile.id).bind(&profile.user_id).bind(&profile.name).bind(&profile.email)
            .bind(&profile.phone).bind(profile.created_at).bind(profile.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_profile(&self, profile: &CustomerProfile) -> Result<CustomerProfile, AppError> {
        sqlx::query_as::<_, CustomerProfile>(
            "UPDATE customer_profiles SET name = ?, email = ?, phone = ?, updated_at = ? WHERE id = ? RETURNING *"
        )
            .bind(&profile.name).bind(&profile.email).bind(&profile.phone).bind(profile.updated_at)
            .bind(&profile.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_profile(&self, id: &str) -> Result<Option<CustomerProfile>, AppError> {
        sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customer_profiles WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_profile_by_user(&self, user_id: &str) -> Result<Option<CustomerProfile>, AppError> {
        sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customer_profiles WHERE user_id = ?")
            .bind(user_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn create_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError> {
        sqlx::query_as::<_, CustomerItem>(
            "INSERT INTO customer_items (id, profile_id, make, model, year, registration, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&item.id).bind(&item.profile_id).bind(&item.make).bind(&item.model)
            .bind(item.year).bind(&item.registration).bind(item.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_item(&self, item: &CustomerItem) -> Result<CustomerItem, AppError> {
        sqlx::query_as::<_, CustomerItem>(
            "UPDATE customer_items SET make = ?, model = ?, year = ?, registration = ? WHERE id = ? RETURNING *"
        )
            .bind(&item.make).bind(&item.model).bind(item.year).bind(&item.registration)
            .bind(&item.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_item(&self, id: &str) -> Result<Option<CustomerItem>, AppError> {
        sqlx::query_as::<_, CustomerItem>("SELECT * FROM customer_items WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn reassign_item(&self, item_id: &str, profile_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE customer_items SET profile_id = ? WHERE id = ?")
            .bind(profile_id).bind(item_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Item not found".into())); }
        Ok(())
    }
}
