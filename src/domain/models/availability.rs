use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

/// Global booking calendar rule. Read-only to the engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AvailabilityRule {
    /// Comma separated weekday abbreviations, e.g. "Mon,Tue,Wed,Thu,Fri".
    pub open_days: String,
    #[serde(default)]
    pub advance_notice_days: i64,
    #[serde(default)]
    pub daily_capacity: Option<i64>,
}

impl AvailabilityRule {
    /// Unknown tokens are dropped. An empty result closes every day.
    pub fn open_weekdays(&self) -> HashSet<Weekday> {
        self.open_days
            .split(',')
            .filter_map(|token| parse_weekday(token.trim()))
            .collect()
    }

    /// `None` when capacity is unconstrained (unset or <= 0).
    pub fn capacity_limit(&self) -> Option<i64> {
        self.daily_capacity.filter(|limit| *limit > 0)
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token.to_ascii_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct BlockedPeriod {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl BlockedPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_date,
            end_date,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// One entry of the disabled-dates list handed to date pickers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DisabledDate {
    Single(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl DisabledDate {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            DisabledDate::Single(d) => *d == date,
            DisabledDate::Range { from, to } => *from <= date && date <= *to,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct AvailabilitySnapshot {
    pub min_date: NaiveDate,
    pub disabled_dates: Vec<DisabledDate>,
}

impl AvailabilitySnapshot {
    pub fn is_disabled(&self, date: NaiveDate) -> bool {
        date < self.min_date || self.disabled_dates.iter().any(|d| d.contains(date))
    }
}
