use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    Full,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Full => "full",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundInitiator {
    Customer,
    Admin,
}

impl RefundInitiator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundInitiator::Customer => "customer",
            RefundInitiator::Admin => "admin",
        }
    }
}

/// Matched when the booking is at least `days_before` whole days away.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RefundTier {
    pub days_before: i64,
    /// 10000 = 100%.
    pub percentage_bps: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RefundPolicy {
    pub version: String,
    pub full_payment: Vec<RefundTier>,
    pub deposit: Vec<RefundTier>,
    pub deduct_gateway_fee: bool,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        let tiers = vec![
            RefundTier { days_before: 7, percentage_bps: 10_000 },
            RefundTier { days_before: 3, percentage_bps: 5_000 },
            RefundTier { days_before: 1, percentage_bps: 0 },
        ];
        Self {
            version: "v1".to_string(),
            full_payment: tiers.clone(),
            deposit: tiers,
            deduct_gateway_fee: false,
        }
    }
}

impl RefundPolicy {
    pub fn tiers_for(&self, payment_type: PaymentType) -> &[RefundTier] {
        match payment_type {
            PaymentType::Deposit => &self.deposit,
            PaymentType::Full => &self.full_payment,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GatewayFee {
    pub fixed_amount: i64,
    pub basis_points: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FeeSchedule {
    pub domestic: GatewayFee,
    pub international: GatewayFee,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            domestic: GatewayFee { fixed_amount: 30, basis_points: 170 },
            international: GatewayFee { fixed_amount: 30, basis_points: 350 },
        }
    }
}

impl FeeSchedule {
    pub fn select(&self, international: bool) -> GatewayFee {
        if international { self.international } else { self.domestic }
    }
}

/// Append-only audit row for one refund computation.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct RefundCalculationRecord {
    pub id: String,
    pub booking_id: String,
    pub initiated_by: String,
    pub policy_version: String,
    pub payment_type: String,
    pub days_before: i64,
    pub amount_paid: i64,
    pub matched_tier_days: Option<i64>,
    pub percentage_bps: i64,
    pub amount_before_fees: i64,
    pub fee_deducted: i64,
    pub final_amount: i64,
    pub created_at: DateTime<Utc>,
}
