use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Pending,
    RequiresAction,
    Succeeded,
    Failed,
    Canceled,
}

impl PaymentIntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::Pending => "pending",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Succeeded => "succeeded",
            PaymentIntentStatus::Failed => "failed",
            PaymentIntentStatus::Canceled => "canceled",
        }
    }

    /// Parses a locally stored status. Unknown values are treated as failed.
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => PaymentIntentStatus::Pending,
            "requires_action" => PaymentIntentStatus::RequiresAction,
            "succeeded" => PaymentIntentStatus::Succeeded,
            "canceled" => PaymentIntentStatus::Canceled,
            _ => PaymentIntentStatus::Failed,
        }
    }

    /// Maps a Stripe-style remote status onto the local lifecycle.
    pub fn from_gateway(value: &str) -> Self {
        match value {
            "requires_payment_method" | "requires_confirmation" | "processing" => PaymentIntentStatus::Pending,
            "requires_action" => PaymentIntentStatus::RequiresAction,
            "succeeded" => PaymentIntentStatus::Succeeded,
            "canceled" => PaymentIntentStatus::Canceled,
            _ => PaymentIntentStatus::Failed,
        }
    }

    /// Amount and currency may still be changed remotely.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, PaymentIntentStatus::Pending | PaymentIntentStatus::RequiresAction)
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, PaymentIntentStatus::Failed | PaymentIntentStatus::Canceled)
    }
}

/// Local mirror of one gateway payment attempt.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PaymentIntentRecord {
    pub id: String,
    pub intent_id: String,
    /// Set while the draft is alive; cleared when the booking is committed.
    pub draft_token: Option<String>,
    pub booking_id: Option<String>,
    pub profile_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntentRecord {
    pub fn new(intent: &GatewayIntent, draft_token: String, profile_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            intent_id: intent.id.clone(),
            draft_token: Some(draft_token),
            booking_id: None,
            profile_id,
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: intent.status.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> PaymentIntentStatus {
        PaymentIntentStatus::parse(&self.status)
    }

    /// Returns true when the stored status actually changed.
    pub fn apply_status(&mut self, status: PaymentIntentStatus) -> bool {
        if self.status() == status {
            return false;
        }
        self.status = status.as_str().to_string();
        self.updated_at = Utc::now();
        true
    }
}

/// Gateway-side view of a payment intent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
}

impl GatewayIntent {
    pub fn matches(&self, amount: i64, currency: &str) -> bool {
        self.amount == amount && self.currency.eq_ignore_ascii_case(currency)
    }
}

/// Correlation data attached to every remote intent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IntentMetadata {
    pub draft_token: String,
    pub profile_id: Option<String>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(PaymentIntentStatus::from_gateway("requires_payment_method"), PaymentIntentStatus::Pending);
        assert_eq!(PaymentIntentStatus::from_gateway("requires_confirmation"), PaymentIntentStatus::Pending);
        assert_eq!(PaymentIntentStatus::from_gateway("processing"), PaymentIntentStatus::Pending);
        assert_eq!(PaymentIntentStatus::from_gateway("requires_action"), PaymentIntentStatus::RequiresAction);
        assert_eq!(PaymentIntentStatus::from_gateway("succeeded"), PaymentIntentStatus::Succeeded);
        assert_eq!(PaymentIntentStatus::from_gateway("canceled"), PaymentIntentStatus::Canceled);
        assert_eq!(PaymentIntentStatus::from_gateway("something_new"), PaymentIntentStatus::Failed);
    }

    #[test]
    fn test_modifiable_and_terminal_sets_are_disjoint() {
        let all = [
            PaymentIntentStatus::Pending,
            PaymentIntentStatus::RequiresAction,
            PaymentIntentStatus::Succeeded,
            PaymentIntentStatus::Failed,
            PaymentIntentStatus::Canceled,
        ];
        for status in all {
            assert!(!(status.is_modifiable() && status.is_terminal_failure()));
            assert_eq!(PaymentIntentStatus::parse(status.as_str()), status);
        }
        assert!(!PaymentIntentStatus::Succeeded.is_modifiable());
        assert!(!PaymentIntentStatus::Succeeded.is_terminal_failure());
    }

    #[test]
    fn test_apply_status_reports_changes_only() {
        let intent = GatewayIntent {
            id: "pi_1".into(),
            client_secret: Some("secret".into()),
            amount: 1000,
            currency: "aud".into(),
            status: PaymentIntentStatus::Pending,
        };
        let mut record = PaymentIntentRecord::new(&intent, "tok".into(), None);
        assert!(!record.apply_status(PaymentIntentStatus::Pending));
        assert!(record.apply_status(PaymentIntentStatus::Succeeded));
        assert!(!record.apply_status(PaymentIntentStatus::Succeeded));
        assert!(intent.matches(1000, "AUD"));
        assert!(!intent.matches(1001, "AUD"));
    }
}
