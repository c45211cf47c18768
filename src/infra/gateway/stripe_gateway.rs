use crate::domain::models::payment::{GatewayIntent, IntentMetadata, PaymentIntentStatus};
use crate::domain::ports::PaymentGateway;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument};

/// Payment intents over the Stripe REST API. Calls are not retried; a failure aborts the step.
pub struct StripeGateway {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_url: String, secret_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn form(amount: i64, currency: &str, metadata: &IntentMetadata) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("amount", amount.to_string()),
            ("currency", currency.to_lowercase()),
            ("description", metadata.description.clone()),
            ("metadata[draft_token]", metadata.draft_token.clone()),
        ];
        if let Some(profile_id) = &metadata.profile_id {
            form.push(("metadata[profile_id]", profile_id.clone()));
        }
        form
    }

    async fn parse(res: Result<Response, reqwest::Error>) -> Result<GatewayIntent, AppError> {
        let res = res.map_err(|e| {
            error!("Gateway network error: {:?}", e);
            AppError::Gateway(format!("Network error: {}", e))
        })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            error!("Gateway returned {}: {}", status, text);
            return Err(AppError::Gateway(format!("Gateway returned {}", status)));
        }

        let body: StripeIntent = res.json().await.map_err(|e| {
            error!("Failed to parse gateway response JSON: {:?}", e);
            AppError::Gateway("Malformed gateway response".into())
        })?;
        Ok(body.into())
    }
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
}

impl From<StripeIntent> for GatewayIntent {
    fn from(intent: StripeIntent) -> Self {
        GatewayIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: PaymentIntentStatus::from_gateway(&intent.status),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, metadata))]
    async fn create_intent(&self, amount: i64, currency: &str, metadata: &IntentMetadata) -> Result<GatewayIntent, AppError> {
        let mut form = Self::form(amount, currency, metadata);
        form.push(("automatic_payment_methods[enabled]", "true".to_string()));

        let res = self.client.post(format!("{}/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await;
        Self::parse(res).await
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        let res = self.client.get(format!("{}/payment_intents/{}", self.api_url, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await;
        Self::parse(res).await
    }

    #[instrument(skip(self, metadata))]
    async fn update_intent(
        &self,
        intent_id: &str,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, AppError> {
        let res = self.client.post(format!("{}/payment_intents/{}", self.api_url, intent_id))
            .bearer_auth(&self.secret_key)
            .form(&Self::form(amount, currency, metadata))
            .send()
            .await;
        Self::parse(res).await
    }

    #[instrument(skip(self))]
    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        let res = self.client.post(format!("{}/payment_intents/{}/cancel", self.api_url, intent_id))
            .bearer_auth(&self.secret_key)
            .form(&[("cancellation_reason", "abandoned")])
            .send()
            .await;
        Self::parse(res).await
    }
}
