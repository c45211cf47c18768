use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use crate::domain::models::draft::PaymentOption;
use crate::domain::services::draft_service::{ItemDetails, ProfileDetails, Selection};
use crate::error::{AppError, FieldError};

const MAX_NOTES_LEN: usize = 2000;
const MAX_FIELD_LEN: usize = 200;

fn finish<T>(errors: Vec<FieldError>, value: T) -> Result<T, AppError> {
    if errors.is_empty() { Ok(value) } else { Err(AppError::InvalidFields(errors)) }
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, "This field is required"));
    } else if trimmed.len() > MAX_FIELD_LEN {
        errors.push(FieldError::new(field, format!("Must be at most {} characters", MAX_FIELD_LEN)));
    }
    trimmed.to_string()
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
pub struct SelectionRequest {
    pub service_type_id: String,
    pub booking_date: String,
    pub customer_notes: Option<String>,
}

impl SelectionRequest {
    pub fn validate(self) -> Result<Selection, AppError> {
        let mut errors = Vec::new();
        let service_type_id = required(&mut errors, "service_type_id", &self.service_type_id);

        let booking_date = match NaiveDate::parse_from_str(self.booking_date.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new("booking_date", "Expected a date in YYYY-MM-DD format"));
                None
            }
        };

        let customer_notes = optional(self.customer_notes);
        if customer_notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            errors.push(FieldError::new("customer_notes", format!("Must be at most {} characters", MAX_NOTES_LEN)));
        }

        match booking_date {
            Some(booking_date) => finish(errors, Selection { service_type_id, booking_date, customer_notes }),
            None => Err(AppError::InvalidFields(errors)),
        }
    }
}

#[derive(Deserialize)]
pub struct ItemRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub registration: Option<String>,
}

impl ItemRequest {
    pub fn validate(self) -> Result<ItemDetails, AppError> {
        let mut errors = Vec::new();
        let make = required(&mut errors, "make", &self.make);
        let model = required(&mut errors, "model", &self.model);

        let latest = Utc::now().year() + 1;
        if !(1900..=latest).contains(&self.year) {
            errors.push(FieldError::new("year", format!("Year must be between 1900 and {}", latest)));
        }

        let registration = optional(self.registration).map(|r| r.to_uppercase());
        finish(errors, ItemDetails { make, model, year: self.year, registration })
    }
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

impl ProfileRequest {
    pub fn validate(self) -> Result<ProfileDetails, AppError> {
        let mut errors = Vec::new();
        let name = required(&mut errors, "name", &self.name);
        let email = required(&mut errors, "email", &self.email).to_lowercase();
        if !email.is_empty() && !looks_like_email(&email) {
            errors.push(FieldError::new("email", "Enter a valid email address"));
        }

        let phone = optional(self.phone);
        if let Some(phone) = &phone
            && !phone.chars().all(|c| c.is_ascii_digit() || " +-()".contains(c)) {
            errors.push(FieldError::new("phone", "Phone may only contain digits, spaces and + - ( )"));
        }

        finish(errors, ProfileDetails { name, email, phone })
    }
}

#[derive(Deserialize)]
pub struct PaymentOptionRequest {
    pub payment_option: String,
}

impl PaymentOptionRequest {
    pub fn validate(self) -> Result<PaymentOption, AppError> {
        PaymentOption::parse(self.payment_option.trim()).ok_or_else(|| {
            AppError::InvalidFields(vec![FieldError::new("payment_option", "Unknown payment option")])
        })
    }
}

#[derive(Deserialize)]
pub struct PaymentCallbackRequest {
    pub intent_id: String,
}

#[derive(Deserialize)]
pub struct PaymentStatusQuery {
    pub intent_id: String,
}

#[derive(Deserialize, Default)]
pub struct RefundCalculationRequest {
    #[serde(default)]
    pub international: bool,
}

/// Subset of a gateway event envelope.
#[derive(Deserialize)]
pub struct GatewayEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Deserialize)]
pub struct GatewayEventData {
    pub object: GatewayEventObject,
}

#[derive(Deserialize)]
pub struct GatewayEventObject {
    pub id: String,
}
