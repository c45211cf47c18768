use std::sync::Arc;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use crate::config::BookingSettings;
use crate::domain::models::booking::{FinalizedBooking, PaymentStatus};
use crate::domain::models::refund::{
    FeeSchedule, PaymentType, RefundCalculationRecord, RefundInitiator, RefundPolicy, RefundTier,
};
use crate::domain::ports::RefundRepository;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub scheduled_date: NaiveDate,
    pub payment_type: PaymentType,
    pub amount_paid: i64,
    pub now: DateTime<Utc>,
    pub international: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefundOutcome {
    pub days_before: i64,
    pub matched_tier: Option<RefundTier>,
    pub percentage_bps: i64,
    pub amount_before_fees: i64,
    pub fee_deducted: i64,
    pub final_amount: i64,
}

/// Whole days from `now` until the start of `scheduled` in the shop's timezone, floored.
pub fn days_before(scheduled: NaiveDate, now: DateTime<Utc>, tz: Tz) -> i64 {
    let midnight = scheduled.and_time(NaiveTime::MIN);
    let start = tz
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
    (start - now).num_seconds().div_euclid(86_400)
}

/// Walks tiers from the largest threshold down and returns the first one the booking satisfies.
pub fn match_tier(tiers: &[RefundTier], days_before: i64) -> Option<RefundTier> {
    let mut ordered = tiers.to_vec();
    ordered.sort_by(|a, b| b.days_before.cmp(&a.days_before));
    ordered.into_iter().find(|tier| tier.days_before <= days_before)
}

pub fn calculate(policy: &RefundPolicy, fees: &FeeSchedule, tz: Tz, request: &RefundRequest) -> RefundOutcome {
    let days = days_before(request.scheduled_date, request.now, tz);
    let tier = match_tier(policy.tiers_for(request.payment_type), days);
    let percentage_bps = tier.map(|t| t.percentage_bps).unwrap_or(0);

    let paid = request.amount_paid.max(0);
    let amount_before_fees = (paid * percentage_bps / 10_000).clamp(0, paid);

    let fee_deducted = if policy.deduct_gateway_fee && amount_before_fees > 0 {
        let fee = fees.select(request.international);
        (fee.fixed_amount + paid * fee.basis_points / 10_000).min(amount_before_fees)
    } else {
        0
    };

    RefundOutcome {
        days_before: days,
        matched_tier: tier,
        percentage_bps,
        amount_before_fees,
        fee_deducted,
        final_amount: amount_before_fees - fee_deducted,
    }
}

pub struct RefundService {
    settings: Arc<BookingSettings>,
    refund_repo: Arc<dyn RefundRepository>,
}

impl RefundService {
    pub fn new(settings: Arc<BookingSettings>, refund_repo: Arc<dyn RefundRepository>) -> Self {
        Self { settings, refund_repo }
    }

    /// Computes and records the refund owed for a booking. In-store bookings are refunded manually.
    pub async fn calculate_for_booking(
        &self,
        booking: &FinalizedBooking,
        initiator: RefundInitiator,
        international: bool,
        now: DateTime<Utc>,
    ) -> Result<(RefundOutcome, RefundCalculationRecord), AppError> {
        let payment_type = if booking.payment_status == PaymentStatus::DepositPaid.as_str() {
            PaymentType::Deposit
        } else if booking.payment_status == PaymentStatus::Paid.as_str() {
            PaymentType::Full
        } else {
            return Err(AppError::Validation(
                "Refunds for in-store payments are handled manually".into(),
            ));
        };

        let request = RefundRequest {
            scheduled_date: booking.booking_date,
            payment_type,
            amount_paid: booking.amount_paid,
            now,
            international,
        };
        let policy = &booking.refund_policy.0;
        let outcome = calculate(policy, &self.settings.gateway_fees, self.settings.tz(), &request);

        let record = RefundCalculationRecord {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            initiated_by: initiator.as_str().to_string(),
            policy_version: policy.version.clone(),
            payment_type: payment_type.as_str().to_string(),
            days_before: outcome.days_before,
            amount_paid: request.amount_paid,
            matched_tier_days: outcome.matched_tier.map(|t| t.days_before),
            percentage_bps: outcome.percentage_bps,
            amount_before_fees: outcome.amount_before_fees,
            fee_deducted: outcome.fee_deducted,
            final_amount: outcome.final_amount,
            created_at: now,
        };
        let record = self.refund_repo.create(&record).await?;

        info!(
            booking = %booking.reference,
            initiated_by = initiator.as_str(),
            days_before = outcome.days_before,
            final_amount = outcome.final_amount,
            "Refund calculated"
        );
        Ok((outcome, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::models::refund::GatewayFee;

    fn tiers() -> Vec<RefundTier> {
        vec![
            RefundTier { days_before: 10, percentage_bps: 10_000 },
            RefundTier { days_before: 5, percentage_bps: 5_000 },
            RefundTier { days_before: 2, percentage_bps: 0 },
        ]
    }

    fn policy(deduct_fee: bool) -> RefundPolicy {
        RefundPolicy { version: "test".into(), full_payment: tiers(), deposit: tiers(), deduct_gateway_fee: deduct_fee }
    }

    fn request_days_ahead(days: i64, amount: i64) -> RefundRequest {
        let scheduled = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let start = scheduled.and_hms_opt(0, 0, 0).unwrap().and_utc();
        RefundRequest {
            scheduled_date: scheduled,
            payment_type: PaymentType::Full,
            amount_paid: amount,
            // An hour past the whole-day boundary.
            now: start - Duration::days(days) - Duration::hours(1),
            international: false,
        }
    }

    #[test]
    fn test_tier_selection() {
        let p = policy(false);
        let fees = FeeSchedule::default();

        let out = calculate(&p, &fees, chrono_tz::UTC, &request_days_ahead(12, 20_000));
        assert_eq!(out.days_before, 12);
        assert_eq!(out.percentage_bps, 10_000);
        assert_eq!(out.final_amount, 20_000);

        let out = calculate(&p, &fees, chrono_tz::UTC, &request_days_ahead(7, 20_000));
        assert_eq!(out.matched_tier.map(|t| t.days_before), Some(5));
        assert_eq!(out.final_amount, 10_000);

        let out = calculate(&p, &fees, chrono_tz::UTC, &request_days_ahead(1, 20_000));
        assert_eq!(out.matched_tier, None);
        assert_eq!(out.final_amount, 0);
    }

    #[test]
    fn test_tiers_are_matched_regardless_of_input_order() {
        let mut shuffled = tiers();
        shuffled.reverse();
        assert_eq!(match_tier(&shuffled, 12).map(|t| t.percentage_bps), Some(10_000));
        assert_eq!(match_tier(&shuffled, 5).map(|t| t.percentage_bps), Some(5_000));
        assert_eq!(match_tier(&shuffled, 2).map(|t| t.percentage_bps), Some(0));
    }

    #[test]
    fn test_days_before_floors() {
        let scheduled = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        let start = scheduled.and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert_eq!(days_before(scheduled, start - Duration::hours(47), chrono_tz::UTC), 1);
        assert_eq!(days_before(scheduled, start - Duration::hours(48), chrono_tz::UTC), 2);
        assert_eq!(days_before(scheduled, start + Duration::hours(1), chrono_tz::UTC), -1);
    }

    #[test]
    fn test_days_before_uses_shop_timezone() {
        let scheduled = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        // Midnight in Perth (UTC+8) is 16:00 UTC the day before.
        let now = NaiveDate::from_ymd_opt(2025, 8, 8).unwrap().and_hms_opt(17, 0, 0).unwrap().and_utc();
        assert_eq!(days_before(scheduled, now, chrono_tz::UTC), 1);
        assert_eq!(days_before(scheduled, now, chrono_tz::Australia::Perth), 0);
    }

    #[test]
    fn test_gateway_fee_is_deducted_and_floored() {
        let p = policy(true);
        let fees = FeeSchedule {
            domestic: GatewayFee { fixed_amount: 30, basis_points: 170 },
            international: GatewayFee { fixed_amount: 30, basis_points: 350 },
        };

        let out = calculate(&p, &fees, chrono_tz::UTC, &request_days_ahead(12, 10_000));
        assert_eq!(out.amount_before_fees, 10_000);
        assert_eq!(out.fee_deducted, 200);
        assert_eq!(out.final_amount, 9_800);

        let mut intl = request_days_ahead(12, 10_000);
        intl.international = true;
        assert_eq!(calculate(&p, &fees, chrono_tz::UTC, &intl).final_amount, 9_620);

        // The fee can never push the refund below zero.
        let tiny = RefundPolicy {
            full_payment: vec![RefundTier { days_before: 0, percentage_bps: 100 }],
            ..policy(true)
        };
        let out = calculate(&tiny, &fees, chrono_tz::UTC, &request_days_ahead(3, 1_000));
        assert_eq!(out.amount_before_fees, 10);
        assert_eq!(out.final_amount, 0);
    }
}
