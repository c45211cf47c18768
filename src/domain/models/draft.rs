use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::FromRow;
use rand::{distributions::Alphanumeric, Rng};

const TOKEN_LENGTH: usize = 48;

/// Payment choice as submitted by the customer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    OnlineFull,
    OnlineDeposit,
    InStore,
}

impl PaymentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOption::OnlineFull => "online_full",
            PaymentOption::OnlineDeposit => "online_deposit",
            PaymentOption::InStore => "in_store",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online_full" => Some(PaymentOption::OnlineFull),
            "online_deposit" => Some(PaymentOption::OnlineDeposit),
            "in_store" => Some(PaymentOption::InStore),
            _ => None,
        }
    }
}

/// Payment choice resolved once at selection time, carrying the amount due.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedPayment {
    FullOnline { amount: i64 },
    DepositOnline { amount: i64 },
    InStore,
}

impl ResolvedPayment {
    pub fn option(&self) -> PaymentOption {
        match self {
            ResolvedPayment::FullOnline { .. } => PaymentOption::OnlineFull,
            ResolvedPayment::DepositOnline { .. } => PaymentOption::OnlineDeposit,
            ResolvedPayment::InStore => PaymentOption::InStore,
        }
    }

    /// Amount to collect online; `None` for in-store.
    pub fn online_amount(&self) -> Option<i64> {
        match self {
            ResolvedPayment::FullOnline { amount } | ResolvedPayment::DepositOnline { amount } => Some(*amount),
            ResolvedPayment::InStore => None,
        }
    }

    fn from_columns(option: Option<&str>, amount: Option<i64>) -> Option<Self> {
        match (option.and_then(PaymentOption::parse), amount) {
            (Some(PaymentOption::OnlineFull), Some(amount)) => Some(ResolvedPayment::FullOnline { amount }),
            (Some(PaymentOption::OnlineDeposit), Some(amount)) => Some(ResolvedPayment::DepositOnline { amount }),
            (Some(PaymentOption::InStore), _) => Some(ResolvedPayment::InStore),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftStep {
    Selection,
    Item,
    Profile,
    PaymentOption,
    Payment,
}

impl DraftStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStep::Selection => "selection",
            DraftStep::Item => "item",
            DraftStep::Profile => "profile",
            DraftStep::PaymentOption => "payment_option",
            DraftStep::Payment => "payment",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct DraftReservation {
    pub token: String,
    pub service_type_id: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub total_amount: i64,
    pub deposit_amount: Option<i64>,
    pub item_id: Option<String>,
    pub profile_id: Option<String>,
    pub payment_option: Option<String>,
    pub payment_amount: Option<i64>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct NewDraftParams {
    pub service_type_id: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub total_amount: i64,
    pub customer_notes: Option<String>,
    pub ttl: Option<Duration>,
}

impl DraftReservation {
    pub fn new(params: NewDraftParams) -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let now = Utc::now();

        Self {
            token,
            service_type_id: params.service_type_id,
            service_name: params.service_name,
            booking_date: params.booking_date,
            total_amount: params.total_amount,
            deposit_amount: None,
            item_id: None,
            profile_id: None,
            payment_option: None,
            payment_amount: None,
            customer_notes: params.customer_notes,
            created_at: now,
            updated_at: now,
            expires_at: params.ttl.map(|ttl| now + ttl),
        }
    }

    pub fn payment(&self) -> Option<ResolvedPayment> {
        ResolvedPayment::from_columns(self.payment_option.as_deref(), self.payment_amount)
    }

    pub fn set_payment(&mut self, payment: Option<ResolvedPayment>) {
        self.payment_option = payment.map(|p| p.option().as_str().to_string());
        self.payment_amount = payment.and_then(|p| p.online_amount());
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Records a successful mutation and slides the expiry window forward.
    pub fn touch(&mut self, ttl: Option<Duration>) {
        let now = Utc::now();
        self.updated_at = now;
        if let Some(ttl) = ttl {
            self.expires_at = Some(now + ttl);
        }
    }

    /// First step still missing before payment can be entered.
    pub fn next_step(&self) -> DraftStep {
        if self.item_id.is_none() {
            DraftStep::Item
        } else if self.profile_id.is_none() {
            DraftStep::Profile
        } else if self.payment().is_none() {
            DraftStep::PaymentOption
        } else {
            DraftStep::Payment
        }
    }
}
