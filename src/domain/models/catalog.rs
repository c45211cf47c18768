use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ServiceType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub base_price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ServiceType {
    pub fn new(name: String, description: Option<String>, base_price: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            base_price,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
