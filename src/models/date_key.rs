use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Offset of the reference zone used for day partitioning (Asia/Tokyo,
/// which has no daylight saving time).
pub const REFERENCE_OFFSET_SECS: i64 = 9 * 3600;

/// Calendar day in the reference zone, rendered `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Reference-zone day of `timestamp`. Instants too close to the end of
    /// the representable range to shift keep their UTC date.
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let local = timestamp
            .checked_add_signed(Duration::seconds(REFERENCE_OFFSET_SECS))
            .unwrap_or(timestamp);
        Self(local.date_naive())
    }

    /// Whether `timestamp` falls on a day with a four-digit year, the range
    /// partition ids and day bounds are defined for.
    pub fn supports(timestamp: DateTime<Utc>) -> bool {
        (1..=9999).contains(&Self::from_timestamp(timestamp).0.year())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// First instant of this day in the reference zone.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc() - Duration::seconds(REFERENCE_OFFSET_SECS)
    }

    /// Last representable instant of this day in the reference zone.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.start_utc() + Duration::days(1) - Duration::nanoseconds(1)
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Every day from `self` through `end`, inclusive.
    pub fn days_through(self, end: DateKey) -> impl Iterator<Item = DateKey> {
        self.0
            .iter_days()
            .take_while(move |day| *day <= end.0)
            .map(DateKey)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("Invalid date key '{s}': {e}"))?;
        let key = DateKey(date);
        // Partition ids must be canonical, "2025-1-5" would name a different document.
        if key.to_string() != s {
            return Err(format!("Date key '{s}' is not in YYYY-MM-DD form"));
        }
        Ok(key)
    }
}

impl TryFrom<String> for DateKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}
