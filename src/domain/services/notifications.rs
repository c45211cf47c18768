use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{error, info, warn};
use crate::domain::models::job::{Job, JOB_BOOKING_CONFIRMED, JOB_FINALIZATION_CONFLICT};
use crate::domain::ports::{BookingRepository, EmailService, ProfileRepository};
use crate::error::AppError;

const CONFIRMED_SUBJECT: &str = "Your booking {{ reference }} is confirmed";
const CONFIRMED_BODY: &str = r#"<p>Hi {{ customer_name }},</p>
<p>Thanks for booking <strong>{{ service_name }}</strong> on {{ booking_date }}.</p>
<p>Your reference is <strong>{{ reference }}</strong>.</p>
{% if pay_in_store %}<p>Payment of {{ total }} {{ currency }} is due when you arrive.</p>
{% else %}<p>We received {{ amount_paid }} {{ currency }} of {{ total }} {{ currency }}.</p>{% endif %}"#;

const CONFLICT_SUBJECT: &str = "Action required: payment received for an unconfirmed booking";
const CONFLICT_BODY: &str = r#"<p>A payment succeeded but the booking could not be committed.</p>
<ul>
<li>Payment intent: {{ intent_id }}</li>
<li>Reservation: {{ draft_token }}</li>
<li>Date: {{ booking_date }}</li>
<li>Detail: {{ detail }}</li>
</ul>
<p>Contact the customer to rebook or refund.</p>"#;

pub fn format_amount(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Renders and delivers outbox jobs.
pub struct NotificationService {
    booking_repo: Arc<dyn BookingRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    email_service: Arc<dyn EmailService>,
    admin_email: Option<String>,
    templates: Tera,
}

impl NotificationService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        email_service: Arc<dyn EmailService>,
        admin_email: Option<String>,
    ) -> Result<Self, AppError> {
        let mut templates = Tera::default();
        templates
            .add_raw_templates(vec![
                ("confirmed_subject", CONFIRMED_SUBJECT),
                ("confirmed_body", CONFIRMED_BODY),
                ("conflict_subject", CONFLICT_SUBJECT),
                ("conflict_body", CONFLICT_BODY),
            ])
            .map_err(|e| AppError::InternalWithMsg(format!("Tera parse error: {:?}", e)))?;

        Ok(Self { booking_repo, profile_repo, email_service, admin_email, templates })
    }

    pub async fn process(&self, job: &Job) -> Result<(), AppError> {
        match job.job_type.as_str() {
            JOB_BOOKING_CONFIRMED => self.send_confirmation(job).await,
            JOB_FINALIZATION_CONFLICT => self.send_conflict_alert(job).await,
            other => Err(AppError::InternalWithMsg(format!("Unknown job type {}", other))),
        }
    }

    async fn send_confirmation(&self, job: &Job) -> Result<(), AppError> {
        let booking_id = job.payload.booking_id.as_deref()
            .ok_or_else(|| AppError::InternalWithMsg("Confirmation job without booking id".into()))?;
        let booking = self.booking_repo.find_by_id(booking_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))?;

        let profile = match &booking.profile_id {
            Some(id) => self.profile_repo.find_profile(id).await?,
            None => None,
        };
        let Some(profile) = profile else {
            warn!(reference = %booking.reference, "Booking has no customer profile, skipping confirmation");
            return Ok(());
        };

        let mut context = Context::new();
        context.insert("customer_name", &profile.name);
        context.insert("service_name", &booking.service_name);
        context.insert("booking_date", &booking.booking_date.format("%A %-d %B %Y").to_string());
        context.insert("reference", &booking.reference);
        context.insert("amount_paid", &format_amount(booking.amount_paid));
        context.insert("total", &format_amount(booking.total_amount));
        context.insert("currency", &booking.currency.to_uppercase());
        context.insert("pay_in_store", &(booking.payment_status == "pay_in_store"));

        let subject = self.render("confirmed_subject", &context)?;
        let body = self.render("confirmed_body", &context)?;

        info!(reference = %booking.reference, "Sending booking confirmation to {}", profile.email);
        self.email_service.send(&profile.email, &subject, &body).await
    }

    async fn send_conflict_alert(&self, job: &Job) -> Result<(), AppError> {
        let payload = &job.payload;
        let Some(recipient) = &self.admin_email else {
            error!(
                operator_action = "required",
                intent_id = ?payload.intent_id,
                "Finalization conflict alert has no recipient, set ADMIN_EMAIL"
            );
            return Ok(());
        };

        let mut context = Context::new();
        context.insert("intent_id", &payload.intent_id.clone().unwrap_or_else(|| "-".into()));
        context.insert("draft_token", &payload.draft_token.clone().unwrap_or_else(|| "-".into()));
        context.insert("booking_date", &payload.booking_date.map(|d| d.to_string()).unwrap_or_default());
        context.insert("detail", &payload.detail.clone().unwrap_or_default());

        let subject = self.render("conflict_subject", &context)?;
        let body = self.render("conflict_body", &context)?;

        info!("Sending finalization conflict alert to {}", recipient);
        self.email_service.send(recipient, &subject, &body).await
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, AppError> {
        self.templates
            .render(name, context)
            .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(25_000), "250.00");
        assert_eq!(format_amount(-1_234), "-12.34");
    }
}
