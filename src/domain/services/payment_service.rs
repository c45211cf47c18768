use std::sync::Arc;
use serde::Serialize;
use tracing::{info, warn};
use crate::config::BookingSettings;
use crate::domain::models::draft::{DraftStep, ResolvedPayment};
use crate::domain::models::payment::{GatewayIntent, IntentMetadata, PaymentIntentRecord, PaymentIntentStatus};
use crate::domain::ports::{PaymentGateway, PaymentRepository};
use crate::domain::services::draft_service::DraftService;
use crate::domain::services::finalizer::{BookingFinalizer, FinalizeOutcome, FinalizeRequest};
use crate::error::{AppError, FieldError};

/// What the client gets back when entering the payment step.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEntry {
    ClientSecret { intent_id: String, client_secret: String, amount: i64, currency: String },
    AlreadySucceeded { intent_id: String },
    InStore { redirect_url: String },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Success,
    RequiresAction,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub status: CallbackStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug)]
pub enum WebhookOutcome {
    Finalized(FinalizeOutcome),
    /// No local record for this intent; not one of ours.
    Ignored,
}

pub fn in_store_redirect(token: &str) -> String {
    format!("/api/v1/drafts/{}/confirm-in-store", token)
}

pub fn status_check_url(intent_id: &str) -> String {
    format!("/api/v1/payments/status?intent_id={}", intent_id)
}

/// Reconciles drafts with the external gateway. Client-originated signals are advisory;
/// only the gateway webhook may finalize.
pub struct PaymentService {
    settings: Arc<BookingSettings>,
    payment_repo: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    drafts: Arc<DraftService>,
    finalizer: Arc<BookingFinalizer>,
}

impl PaymentService {
    pub fn new(
        settings: Arc<BookingSettings>,
        payment_repo: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        drafts: Arc<DraftService>,
        finalizer: Arc<BookingFinalizer>,
    ) -> Self {
        Self { settings, payment_repo, gateway, drafts, finalizer }
    }

    pub async fn enter_payment(&self, token: &str) -> Result<PaymentEntry, AppError> {
        let draft = self.drafts.load(token).await?;

        let step = draft.next_step();
        if step != DraftStep::Payment {
            return Err(AppError::Validation(format!(
                "Reservation is incomplete, continue at the {} step",
                step.as_str()
            )));
        }
        self.drafts.ensure_still_available(&draft).await?;

        let payment = draft.payment().ok_or(AppError::Internal)?;
        let amount = match payment {
            ResolvedPayment::InStore => {
                return Ok(PaymentEntry::InStore { redirect_url: in_store_redirect(token) });
            }
            ResolvedPayment::FullOnline { amount } | ResolvedPayment::DepositOnline { amount } => amount,
        };
        if amount <= 0 {
            return Err(AppError::InvalidFields(vec![FieldError::new(
                "payment_option",
                "This payment option cannot be paid online, please choose another",
            )]));
        }

        let currency = self.settings.currency.to_lowercase();
        let metadata = IntentMetadata {
            draft_token: draft.token.clone(),
            profile_id: draft.profile_id.clone(),
            description: format!("{} on {}", draft.service_name, draft.booking_date),
        };

        if let Some(record) = self.payment_repo.find_by_draft(token).await?
            && let Some(entry) = self.reuse_intent(record, amount, &currency, &metadata).await? {
            return Ok(entry);
        }

        let intent = self.gateway.create_intent(amount, &currency, &metadata).await?;
        let record = PaymentIntentRecord::new(&intent, draft.token.clone(), draft.profile_id.clone());
        self.payment_repo.create(&record).await?;
        info!(intent_id = %intent.id, amount, "Payment intent created");

        client_secret_entry(&intent)
    }

    /// Reuses or updates an earlier intent. `None` means the old attempt is dead and was discarded.
    async fn reuse_intent(
        &self,
        mut record: PaymentIntentRecord,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<Option<PaymentEntry>, AppError> {
        let remote = self.gateway.retrieve_intent(&record.intent_id).await?;

        if remote.status == PaymentIntentStatus::Succeeded {
            if record.apply_status(remote.status) {
                self.payment_repo.update(&record).await?;
            }
            info!(intent_id = %remote.id, "Payment already succeeded, not charging again");
            return Ok(Some(PaymentEntry::AlreadySucceeded { intent_id: remote.id }));
        }

        if remote.status.is_terminal_failure() {
            info!(intent_id = %remote.id, status = remote.status.as_str(), "Discarding dead payment intent");
            self.payment_repo.delete(&record.id).await?;
            return Ok(None);
        }

        let current = if !remote.matches(amount, currency) && remote.status.is_modifiable() {
            let updated = self.gateway.update_intent(&remote.id, amount, currency, metadata).await?;
            info!(intent_id = %updated.id, from = record.amount, to = updated.amount, "Payment intent amount updated");
            record.amount = updated.amount;
            record.currency = updated.currency.clone();
            record.apply_status(updated.status);
            self.payment_repo.update(&record).await?;
            updated
        } else {
            if record.apply_status(remote.status) {
                self.payment_repo.update(&record).await?;
            }
            remote
        };

        client_secret_entry(&current).map(Some)
    }

    /// Drops the draft's intent before the draft leaves without it. A modifiable intent is
    /// canceled at the gateway; a succeeded one blocks the caller.
    async fn release_intent(&self, token: &str) -> Result<(), AppError> {
        let Some(mut record) = self.payment_repo.find_by_draft(token).await? else {
            return Ok(());
        };
        let remote = self.gateway.retrieve_intent(&record.intent_id).await?;

        if remote.status == PaymentIntentStatus::Succeeded {
            if record.apply_status(remote.status) {
                self.payment_repo.update(&record).await?;
            }
            warn!(intent_id = %remote.id, "Reservation already paid by card, refusing to release it");
            return Err(AppError::Conflict(
                "A card payment for this reservation has already gone through. Your booking will be confirmed shortly.".into(),
            ));
        }
        if remote.status.is_modifiable() {
            self.gateway.cancel_intent(&remote.id).await?;
            info!(intent_id = %remote.id, "Payment intent canceled");
        }
        self.payment_repo.delete(&record.id).await
    }

    pub async fn discard_draft(&self, token: &str) -> Result<(), AppError> {
        self.release_intent(token).await?;
        self.drafts.discard(token).await
    }

    /// In-store commit. Any card attempt started earlier in the flow is canceled first.
    pub async fn confirm_in_store(&self, token: &str) -> Result<FinalizeOutcome, AppError> {
        let draft = self.drafts.load(token).await?;
        if draft.payment() == Some(ResolvedPayment::InStore) {
            self.release_intent(token).await?;
        }
        self.finalizer.finalize(FinalizeRequest::InStore(token.to_string())).await
    }

    /// Advisory status report for the browser after confirming a card. Never finalizes.
    pub async fn client_callback(&self, intent_id: &str) -> Result<CallbackOutcome, AppError> {
        let remote = self.gateway.retrieve_intent(intent_id).await?;

        if let Some(mut record) = self.payment_repo.find_by_intent_id(intent_id).await?
            && record.apply_status(remote.status) {
            self.payment_repo.update(&record).await?;
        }

        let outcome = match remote.status {
            PaymentIntentStatus::Succeeded => CallbackOutcome {
                status: CallbackStatus::Success,
                message: "Payment processed successfully. Your booking is being finalized.",
                redirect_url: Some(status_check_url(intent_id)),
            },
            PaymentIntentStatus::Pending | PaymentIntentStatus::RequiresAction => CallbackOutcome {
                status: CallbackStatus::RequiresAction,
                message: "Payment requires further action or is pending.",
                redirect_url: None,
            },
            PaymentIntentStatus::Failed | PaymentIntentStatus::Canceled => CallbackOutcome {
                status: CallbackStatus::Failed,
                message: "Payment failed. Please try again.",
                redirect_url: None,
            },
        };
        Ok(outcome)
    }

    /// Authoritative success signal from the gateway. Safe to deliver any number of times.
    pub async fn webhook_succeeded(&self, intent_id: &str) -> Result<WebhookOutcome, AppError> {
        let Some(mut record) = self.payment_repo.find_by_intent_id(intent_id).await? else {
            warn!(intent_id, "Webhook for unknown payment intent ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        if record.booking_id.is_none() && record.apply_status(PaymentIntentStatus::Succeeded) {
            self.payment_repo.update(&record).await?;
        }

        let outcome = self.finalizer.finalize(FinalizeRequest::Online(intent_id.to_string())).await?;
        Ok(WebhookOutcome::Finalized(outcome))
    }
}

fn client_secret_entry(intent: &GatewayIntent) -> Result<PaymentEntry, AppError> {
    let client_secret = intent.client_secret.clone()
        .ok_or_else(|| AppError::Gateway(format!("Intent {} has no client secret", intent.id)))?;
    Ok(PaymentEntry::ClientSecret {
        intent_id: intent.id.clone(),
        client_secret,
        amount: intent.amount,
        currency: intent.currency.to_uppercase(),
    })
}
