use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CustomerProfile {
    pub id: String,
    /// Owning account, `None` for guest checkouts.
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerProfile {
    pub fn new(user_id: Option<String>, name: String, email: String, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            email,
            phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A customer's vehicle. Belongs to at most one profile at a time.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CustomerItem {
    pub id: String,
    pub profile_id: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub registration: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomerItem {
    pub fn new(profile_id: Option<String>, make: String, model: String, year: i32, registration: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            profile_id,
            make,
            model,
            year,
            registration,
            created_at: Utc::now(),
        }
    }
}
