#![allow(dead_code)]

use reservation_backend::{
    api::router::create_router,
    background::{reap_expired_drafts, run_pending_jobs},
    config::{BookingSettings, Config},
    domain::models::{
        auth::Claims,
        availability::{AvailabilityRule, BlockedPeriod},
        catalog::ServiceType,
        payment::{GatewayIntent, IntentMetadata, PaymentIntentStatus},
        profile::CustomerProfile,
        refund::RefundPolicy,
    },
    domain::ports::{EmailService, PaymentGateway},
    error::AppError,
    infra::factory::sqlite_repositories,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{encode, EncodingKey, Header, Algorithm};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, types::Json, Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "ops@example.com";
pub const SERVICE_PRICE: i64 = 20_000;

/// In-memory stand-in for the card gateway.
#[derive(Default)]
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, GatewayIntent>>,
    pub created: AtomicUsize,
    pub updated: AtomicUsize,
    pub canceled: AtomicUsize,
    pub fail_requests: AtomicBool,
}

impl MockPaymentGateway {
    pub fn set_status(&self, intent_id: &str, status: PaymentIntentStatus) {
        let mut intents = self.intents.lock().unwrap();
        intents.get_mut(intent_id).expect("unknown intent").status = status;
    }

    pub fn intent(&self, intent_id: &str) -> GatewayIntent {
        self.intents.lock().unwrap().get(intent_id).cloned().expect("unknown intent")
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("connection reset by peer".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(&self, amount: i64, currency: &str, _metadata: &IntentMetadata) -> Result<GatewayIntent, AppError> {
        self.check_available()?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_test_{}", n);
        let intent = GatewayIntent {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_{}", id, Uuid::new_v4().simple())),
            amount,
            currency: currency.to_string(),
            status: PaymentIntentStatus::Pending,
        };
        self.intents.lock().unwrap().insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        self.check_available()?;
        self.intents.lock().unwrap().get(intent_id).cloned()
            .ok_or_else(|| AppError::Gateway(format!("No such payment_intent: {}", intent_id)))
    }

    async fn update_intent(&self, intent_id: &str, amount: i64, currency: &str, _metadata: &IntentMetadata) -> Result<GatewayIntent, AppError> {
        self.check_available()?;
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(intent_id)
            .ok_or_else(|| AppError::Gateway(format!("No such payment_intent: {}", intent_id)))?;
        if !intent.status.is_modifiable() {
            return Err(AppError::Gateway("Intent can no longer be modified".into()));
        }
        intent.amount = amount;
        intent.currency = currency.to_string();
        self.updated.fetch_add(1, Ordering::SeqCst);
        Ok(intent.clone())
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        self.check_available()?;
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(intent_id)
            .ok_or_else(|| AppError::Gateway(format!("No such payment_intent: {}", intent_id)))?;
        if intent.status == PaymentIntentStatus::Succeeded {
            return Err(AppError::Gateway("Intent has already succeeded".into()));
        }
        intent.status = PaymentIntentStatus::Canceled;
        self.canceled.fetch_add(1, Ordering::SeqCst);
        Ok(intent.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailService {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

/// Every weekday open, one day notice, two bookings per day.
pub fn test_settings() -> BookingSettings {
    BookingSettings {
        availability: Some(AvailabilityRule {
            open_days: "Mon,Tue,Wed,Thu,Fri,Sat,Sun".to_string(),
            advance_notice_days: 1,
            daily_capacity: Some(2),
        }),
        ..Default::default()
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_ahead(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub gateway: Arc<MockPaymentGateway>,
    pub email: Arc<MockEmailService>,
    pub service: ServiceType,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(test_settings(), None).await
    }

    pub async fn with_settings(settings: BookingSettings) -> Self {
        Self::build(settings, None).await
    }

    pub async fn build(settings: BookingSettings, webhook_secret: Option<&str>) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            admin_email: Some(ADMIN_EMAIL.to_string()),
            jwt_public_key: Some(pub_key_pem.to_string()),
            gateway_api_url: "http://localhost".to_string(),
            gateway_secret_key: "sk_test".to_string(),
            gateway_webhook_secret: webhook_secret.map(str::to_string),
            settings_path: None,
        };

        let gateway = Arc::new(MockPaymentGateway::default());
        let email = Arc::new(MockEmailService::default());

        let state = Arc::new(
            AppState::new(config, settings, sqlite_repositories(pool.clone()), gateway.clone(), email.clone())
                .expect("Failed to build state"),
        );

        let service = state.repos.catalog
            .create(&ServiceType::new("Logbook service".to_string(), None, SERVICE_PRICE))
            .await
            .expect("Failed to seed service");

        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, gateway, email, service }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, body, None).await
    }

    pub async fn request_as(&self, auth: &AuthHeaders, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, body, Some(auth)).await
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>, auth: Option<&AuthHeaders>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    /// Posts a raw webhook body with optional signature header.
    pub async fn post_webhook(&self, body: &str, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/gateway")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        let response = self.router.clone().oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn payment_succeeded(&self, intent_id: &str) -> (StatusCode, Value) {
        self.gateway.set_status(intent_id, PaymentIntentStatus::Succeeded);
        let event = serde_json::json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": intent_id, "object": "payment_intent" } }
        });
        self.post_webhook(&event.to_string(), None).await
    }

    pub fn mint_token(&self, user_id: &str, role: &str) -> AuthHeaders {
        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let csrf_token = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            iss: "test-issuer".to_string(),
            sub: user_id.to_string(),
            aud: "reservation-frontend".to_string(),
            exp: now + 3600,
            iat: now,
            role: role.to_string(),
            csrf_token: csrf_token.clone(),
        };
        let key = EncodingKey::from_ed_pem(priv_key_pem.as_bytes()).unwrap();
        let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();
        AuthHeaders { access_token, csrf_token }
    }

    pub async fn seed_profile(&self, user_id: Option<&str>, email: &str) -> CustomerProfile {
        let profile = CustomerProfile::new(user_id.map(str::to_string), "Existing Customer".into(), email.into(), None);
        self.state.repos.profiles.create_profile(&profile).await.unwrap()
    }

    pub async fn block(&self, start: NaiveDate, end: NaiveDate, reason: &str) {
        self.state.repos.blocked_periods.create(&BlockedPeriod::new(start, end, reason)).await.unwrap();
    }

    /// Inserts a booking row directly so it consumes capacity.
    pub async fn seed_booking(&self, date: NaiveDate, status: &str) {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO bookings (id, reference, service_type_id, service_name, booking_date, payment_option, total_amount, amount_paid, currency, payment_status, status, refund_policy, created_at)
             VALUES (?, ?, ?, ?, ?, 'in_store', ?, 0, 'AUD', 'pay_in_store', ?, ?, ?)"
        )
            .bind(&id)
            .bind(format!("SEED-{}", &id[..8]))
            .bind(&self.service.id)
            .bind(&self.service.name)
            .bind(date)
            .bind(SERVICE_PRICE)
            .bind(status)
            .bind(Json(RefundPolicy::default()))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn create_draft(&self, date: NaiveDate) -> String {
        let (status, body) = self.request("POST", "/api/v1/drafts", Some(serde_json::json!({
            "service_type_id": self.service.id,
            "booking_date": date.to_string(),
            "customer_notes": "Rattle from the rear left wheel"
        }))).await;
        assert_eq!(status, StatusCode::CREATED, "create draft failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn attach_item(&self, token: &str) {
        let (status, body) = self.request("PUT", &format!("/api/v1/drafts/{}/item", token), Some(serde_json::json!({
            "make": "Toyota", "model": "Hilux", "year": 2019, "registration": "1abc234"
        }))).await;
        assert_eq!(status, StatusCode::OK, "attach item failed: {}", body);
    }

    pub async fn attach_profile(&self, token: &str, email: &str) {
        let (status, body) = self.request("PUT", &format!("/api/v1/drafts/{}/profile", token), Some(serde_json::json!({
            "name": "Jamie Driver", "email": email, "phone": "0400 000 000"
        }))).await;
        assert_eq!(status, StatusCode::OK, "attach profile failed: {}", body);
    }

    pub async fn choose_option(&self, token: &str, option: &str) -> (StatusCode, Value) {
        self.request("PUT", &format!("/api/v1/drafts/{}/payment-option", token), Some(serde_json::json!({
            "payment_option": option
        }))).await
    }

    /// Walks a new draft through every step up to payment.
    pub async fn draft_ready_for_payment(&self, date: NaiveDate, option: &str) -> String {
        let token = self.create_draft(date).await;
        self.attach_item(&token).await;
        self.attach_profile(&token, "jamie@example.com").await;
        let (status, body) = self.choose_option(&token, option).await;
        assert_eq!(status, StatusCode::OK, "choose option failed: {}", body);
        token
    }

    /// Enters payment and returns the intent id.
    pub async fn enter_payment(&self, token: &str) -> String {
        let (status, body) = self.request("POST", &format!("/api/v1/drafts/{}/payment", token), None).await;
        assert_eq!(status, StatusCode::OK, "enter payment failed: {}", body);
        assert_eq!(body["kind"], "client_secret", "unexpected payment entry: {}", body);
        body["intent_id"].as_str().unwrap().to_string()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await.unwrap()
    }

    pub async fn run_jobs(&self) -> usize {
        run_pending_jobs(&self.state).await
    }

    pub async fn reap_drafts(&self) -> u64 {
        reap_expired_drafts(&self.state).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
