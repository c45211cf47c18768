use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "ADMIN";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,

    #[serde(rename = "https://booking.com/claims/role")]
    pub role: String,

    #[serde(rename = "https://booking.com/claims/csrf")]
    pub csrf_token: String,
}

/// Caller resolved from the access token cookie.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}
