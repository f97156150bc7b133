// ISO week buckets, the partition key for weekly aggregates.
//
// Notes
// - Buckets are computed in UTC. The key format is `YYYY-Www`, e.g. `2026-W42`.
// - The ISO year can differ from the calendar year around new year.

use crate::shared::core::primitives::Timestamp;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekBucket {
    year: i32,
    week: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid week bucket: {0}")]
pub struct InvalidWeekBucket(String);

impl WeekBucket {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|_| Self { year, week })
    }

    pub fn containing(timestamp: Timestamp) -> Self {
        let date = DateTime::<Utc>::from_timestamp_millis(timestamp)
            .unwrap_or_default()
            .date_naive();
        Self::of_date(date)
    }

    pub fn of_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn monday(&self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }

    /// Monday 00:00 UTC of this week.
    pub fn starts_at(&self) -> Timestamp {
        self.monday()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

    /// Start of the following week, exclusive end of this one.
    pub fn ends_at(&self) -> Timestamp {
        self.starts_at() + Duration::weeks(1).num_milliseconds()
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.starts_at() && timestamp < self.ends_at()
    }

    pub fn previous(&self) -> Self {
        Self::of_date(self.monday() - Duration::weeks(1))
    }

    /// The `count` most recent buckets ending with the week containing `now`, oldest first.
    pub fn last_n(now: Timestamp, count: usize) -> Vec<Self> {
        let mut weeks = Vec::with_capacity(count);
        let mut cursor = Self::containing(now);
        for _ in 0..count {
            weeks.push(cursor);
            cursor = cursor.previous();
        }
        weeks.reverse();
        weeks
    }
}

impl fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekBucket {
    type Err = InvalidWeekBucket;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWeekBucket(value.to_string());
        let (year, week) = value.split_once("-W").ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, week).ok_or_else(invalid)
    }
}

impl TryFrom<String> for WeekBucket {
    type Error = InvalidWeekBucket;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WeekBucket> for String {
    fn from(value: WeekBucket) -> Self {
        value.to_string()
    }
}
