use std::env;
use std::fs;
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::domain::models::availability::AvailabilityRule;
use crate::domain::models::booking::BookingStatus;
use crate::domain::models::refund::{FeeSchedule, RefundPolicy};
use crate::error::AppError;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub admin_email: Option<String>,
    pub jwt_public_key: Option<String>, // Ed25519 public key (PEM)
    pub gateway_api_url: String,
    pub gateway_secret_key: String,
    pub gateway_webhook_secret: Option<String>,
    pub settings_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            jwt_public_key: env::var("JWT_PUBLIC_KEY").ok(),
            gateway_api_url: env::var("GATEWAY_API_URL").unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            gateway_secret_key: env::var("GATEWAY_SECRET_KEY").expect("GATEWAY_SECRET_KEY must be set"),
            gateway_webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET").ok(),
            settings_path: env::var("BOOKING_SETTINGS_PATH").ok(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DepositMethod {
    Flat { amount: i64 },
    Percentage { basis_points: i64 },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DepositSettings {
    pub enabled: bool,
    pub calculation: DepositMethod,
}

impl Default for DepositSettings {
    fn default() -> Self {
        Self { enabled: true, calculation: DepositMethod::Flat { amount: 5_000 } }
    }
}

impl DepositSettings {
    /// Deposit due for a booking worth `total`. Never exceeds the total.
    pub fn amount_for(&self, total: i64) -> i64 {
        let raw = match self.calculation {
            DepositMethod::Flat { amount } => amount,
            DepositMethod::Percentage { basis_points } => total * basis_points / 10_000,
        };
        raw.clamp(0, total.max(0))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PaymentOptionSettings {
    pub online_full: bool,
    pub online_deposit: bool,
    pub in_store: bool,
}

impl Default for PaymentOptionSettings {
    fn default() -> Self {
        Self { online_full: true, online_deposit: true, in_store: true }
    }
}

/// Business configuration injected into every engine component.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BookingSettings {
    pub timezone: String,
    pub availability: Option<AvailabilityRule>,
    pub horizon_days: i64,
    pub counted_statuses: Vec<BookingStatus>,
    pub currency: String,
    pub deposit: DepositSettings,
    pub payment_options: PaymentOptionSettings,
    pub reference_prefix: String,
    pub draft_ttl_hours: Option<i64>,
    pub refund_policy: RefundPolicy,
    pub gateway_fees: FeeSchedule,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            availability: Some(AvailabilityRule {
                open_days: "Mon,Tue,Wed,Thu,Fri".to_string(),
                advance_notice_days: 1,
                daily_capacity: None,
            }),
            horizon_days: 366,
            counted_statuses: vec![BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::InProgress],
            currency: "AUD".to_string(),
            deposit: DepositSettings::default(),
            payment_options: PaymentOptionSettings::default(),
            reference_prefix: "SVC".to_string(),
            draft_ttl_hours: Some(24),
            refund_policy: RefundPolicy::default(),
            gateway_fees: FeeSchedule::default(),
        }
    }
}

impl BookingSettings {
    /// Reads the JSON settings file, or falls back to defaults when no path is configured.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let settings = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .map_err(|e| AppError::InternalWithMsg(format!("Cannot read settings file {}: {}", path, e)))?;
                serde_json::from_str::<BookingSettings>(&raw)
                    .map_err(|e| AppError::InternalWithMsg(format!("Invalid settings file {}: {}", path, e)))?
            }
            None => {
                warn!("BOOKING_SETTINGS_PATH not set, using default booking settings");
                BookingSettings::default()
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.timezone.parse::<Tz>().is_err() {
            return Err(AppError::Validation(format!("Unknown timezone {}", self.timezone)));
        }
        if self.horizon_days <= 0 {
            return Err(AppError::Validation("horizon_days must be positive".into()));
        }
        if self.currency.len() != 3 {
            return Err(AppError::Validation("currency must be a three-letter ISO code".into()));
        }
        if let Some(rule) = &self.availability
            && rule.advance_notice_days < 0 {
            return Err(AppError::Validation("advance_notice_days cannot be negative".into()));
        }
        if let DepositMethod::Percentage { basis_points } = self.deposit.calculation
            && !(0..=10_000).contains(&basis_points) {
            return Err(AppError::Validation("deposit percentage must be between 0 and 10000 basis points".into()));
        }
        let tiers = self.refund_policy.full_payment.iter().chain(self.refund_policy.deposit.iter());
        for tier in tiers {
            if !(0..=10_000).contains(&tier.percentage_bps) {
                return Err(AppError::Validation("refund percentages must be between 0 and 10000 basis points".into()));
            }
        }
        Ok(())
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn draft_ttl(&self) -> Option<Duration> {
        self.draft_ttl_hours.filter(|h| *h > 0).map(Duration::hours)
    }
}
