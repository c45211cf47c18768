use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use tracing::debug;
use crate::config::BookingSettings;
use crate::domain::models::availability::{AvailabilityRule, AvailabilitySnapshot, BlockedPeriod, DisabledDate};
use crate::domain::ports::{BlockedPeriodRepository, BookingRepository};
use crate::error::AppError;

/// Why a date cannot be booked. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    BeforeMinDate { min_date: NaiveDate },
    ClosedWeekday(Weekday),
    Blocked { reason: String },
    FullyBooked { booked: i64, limit: i64 },
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::BeforeMinDate { min_date } => write!(f, "The earliest date that can be booked is {}", min_date),
            Unavailable::ClosedWeekday(day) => write!(f, "We are closed on {}", day),
            Unavailable::Blocked { reason } if reason.is_empty() => write!(f, "This date is not available"),
            Unavailable::Blocked { reason } => write!(f, "This date is not available: {}", reason),
            Unavailable::FullyBooked { .. } => write!(f, "This date is fully booked"),
        }
    }
}

pub fn min_date(rule: Option<&AvailabilityRule>, today: NaiveDate) -> NaiveDate {
    match rule {
        Some(rule) => today + Duration::days(rule.advance_notice_days.max(0)),
        None => today,
    }
}

/// Pre-parsed view of the calendar inputs, so evaluating many dates stays cheap.
pub struct Calendar<'a> {
    rule: Option<&'a AvailabilityRule>,
    open_days: HashSet<Weekday>,
    capacity: Option<i64>,
    blocked: &'a [BlockedPeriod],
    counts: &'a HashMap<NaiveDate, i64>,
    min_date: NaiveDate,
}

impl<'a> Calendar<'a> {
    pub fn new(
        rule: Option<&'a AvailabilityRule>,
        blocked: &'a [BlockedPeriod],
        counts: &'a HashMap<NaiveDate, i64>,
        today: NaiveDate,
    ) -> Self {
        Self {
            rule,
            open_days: rule.map(|r| r.open_weekdays()).unwrap_or_default(),
            capacity: rule.and_then(|r| r.capacity_limit()),
            blocked,
            counts,
            min_date: min_date(rule, today),
        }
    }

    pub fn min_date(&self) -> NaiveDate {
        self.min_date
    }

    pub fn check(&self, date: NaiveDate) -> Result<(), Unavailable> {
        if date < self.min_date {
            return Err(Unavailable::BeforeMinDate { min_date: self.min_date });
        }

        // Without a rule only blocked periods apply.
        if self.rule.is_some() && !self.open_days.contains(&date.weekday()) {
            return Err(Unavailable::ClosedWeekday(date.weekday()));
        }

        if let Some(period) = self.blocked.iter().find(|p| p.contains(date)) {
            return Err(Unavailable::Blocked { reason: period.reason.clone() });
        }

        if let Some(limit) = self.capacity {
            let booked = self.counts.get(&date).copied().unwrap_or(0);
            if booked >= limit {
                return Err(Unavailable::FullyBooked { booked, limit });
            }
        }

        Ok(())
    }

    /// Disabled dates from `min_date` through `min_date + horizon_days`, with runs merged into ranges.
    pub fn snapshot(&self, horizon_days: i64) -> AvailabilitySnapshot {
        let end = self.min_date + Duration::days(horizon_days);
        let mut disabled = Vec::new();
        let mut run: Option<(NaiveDate, NaiveDate)> = None;

        for date in self.min_date.iter_days().take_while(|d| *d <= end) {
            if self.check(date).is_err() {
                run = match run {
                    Some((from, _)) => Some((from, date)),
                    None => Some((date, date)),
                };
            } else if let Some((from, to)) = run.take() {
                disabled.push(to_disabled(from, to));
            }
        }
        if let Some((from, to)) = run {
            disabled.push(to_disabled(from, to));
        }

        AvailabilitySnapshot { min_date: self.min_date, disabled_dates: disabled }
    }
}

fn to_disabled(from: NaiveDate, to: NaiveDate) -> DisabledDate {
    if from == to {
        DisabledDate::Single(from)
    } else {
        DisabledDate::Range { from, to }
    }
}

pub struct AvailabilityService {
    settings: Arc<BookingSettings>,
    blocked_repo: Arc<dyn BlockedPeriodRepository>,
    booking_repo: Arc<dyn BookingRepository>,
}

impl AvailabilityService {
    pub fn new(
        settings: Arc<BookingSettings>,
        blocked_repo: Arc<dyn BlockedPeriodRepository>,
        booking_repo: Arc<dyn BookingRepository>,
    ) -> Self {
        Self { settings, blocked_repo, booking_repo }
    }

    /// Current date in the shop's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.tz()).date_naive()
    }

    pub async fn snapshot(&self, today: NaiveDate) -> Result<AvailabilitySnapshot, AppError> {
        let rule = self.settings.availability.as_ref();
        let start = min_date(rule, today);
        let end = start + Duration::days(self.settings.horizon_days);

        let blocked = self.blocked_repo.list_overlapping(start, end).await?;
        let counts = self.counts(rule, start, end).await?;

        let snapshot = Calendar::new(rule, &blocked, &counts, today).snapshot(self.settings.horizon_days);
        debug!(min_date = %snapshot.min_date, ranges = snapshot.disabled_dates.len(), "Availability computed");
        Ok(snapshot)
    }

    /// Re-evaluates a single date against live data.
    pub async fn check_date(&self, date: NaiveDate, today: NaiveDate) -> Result<Result<(), Unavailable>, AppError> {
        let rule = self.settings.availability.as_ref();
        let blocked = self.blocked_repo.list_overlapping(date, date).await?;
        let counts = self.counts(rule, date, date).await?;
        Ok(Calendar::new(rule, &blocked, &counts, today).check(date))
    }

    async fn counts(
        &self,
        rule: Option<&AvailabilityRule>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>, AppError> {
        // Skip the query when capacity is unconstrained.
        if rule.and_then(|r| r.capacity_limit()).is_none() {
            return Ok(HashMap::new());
        }
        self.booking_repo
            .count_by_date_range(start, end, &self.settings.counted_statuses)
            .await
    }
}
