//! Request/Response DTOs for the journal API.
//!
//! Conventions:
//! - `*Request`  → deserialized from a JSON body
//! - `*Query`    → deserialized from query parameters
//! - `*Response` → serialized to client JSON
//! - Shape checks use `validator` derives; cross-field rules live in
//!   `into_*` conversions that return a message on failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::journal_entry::{MAX_EMOTIONS, MAX_TOPICS};
use crate::models::{
    ActionType, DateKey, EmotionTag, EntryDraft, JournalEntry, LogItem, SleepReport, SortOrder,
};
use crate::services::insights::InsightReport;
use crate::services::DeleteOutcome;

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionInput {
    pub name: String,
    pub color_hex: String,
}

/// POST /api/entries
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    #[validate(length(max = 2000, message = "Feeling must be under 2000 characters"))]
    pub negative_feeling: String,

    #[validate(length(max = 3, message = "At most 3 emotions can be selected"))]
    #[serde(default)]
    pub emotions: Vec<EmotionInput>,

    #[validate(length(max = 3, message = "At most 3 topics can be selected"))]
    #[serde(default)]
    pub topics: Vec<String>,

    /// `true` short on sleep, `false` rested, absent when not answered.
    pub is_sleep_deprived: Option<bool>,

    #[validate(length(max = 200, message = "Next task must be under 200 characters"))]
    #[serde(default)]
    pub next_task: String,

    #[validate(range(max = 1440, message = "Task duration must be at most 1440 minutes"))]
    #[serde(default)]
    pub task_duration_minutes: u32,

    #[validate(length(max = 200, message = "Rest activity must be under 200 characters"))]
    #[serde(default)]
    pub rest_activity: String,

    pub action_type: ActionType,
    pub alarm_time: Option<DateTime<Utc>>,
    /// Defaults to now. Accepted for back-filling.
    pub date: Option<DateTime<Utc>>,
}

impl CreateEntryRequest {
    /// Builds the entry. Call after `validate()`.
    pub fn into_entry(self, now: DateTime<Utc>) -> Result<JournalEntry, String> {
        if self.emotions.len() > MAX_EMOTIONS || self.topics.len() > MAX_TOPICS {
            return Err(format!(
                "At most {MAX_EMOTIONS} emotions and {MAX_TOPICS} topics can be selected"
            ));
        }
        if self.action_type == ActionType::QuickStart && self.alarm_time.is_some() {
            return Err("alarmTime is only allowed for rest entries".into());
        }
        let at = self.date.unwrap_or(now);
        check_instant("date", at)?;
        if let Some(alarm) = self.alarm_time {
            check_instant("alarmTime", alarm)?;
        }

        let emotions = self
            .emotions
            .into_iter()
            .map(|e| EmotionTag::new(e.name, &e.color_hex))
            .collect::<Result<Vec<_>, _>>()?;
        let topics = self
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let draft = EntryDraft {
            negative_feeling: self.negative_feeling,
            emotions,
            topics,
            sleep: match self.is_sleep_deprived {
                Some(true) => SleepReport::Yes,
                Some(false) => SleepReport::No,
                None => SleepReport::Unreported,
            },
            next_task: self.next_task,
            task_duration_minutes: self.task_duration_minutes,
            rest_activity: self.rest_activity,
        };

        Ok(match self.action_type {
            ActionType::QuickStart => JournalEntry::quick_start(draft, at),
            ActionType::Rest => JournalEntry::start_rest(draft, at, self.alarm_time),
        })
    }
}

/// Rejects instants outside the years a date partition can name.
fn check_instant(field: &str, at: DateTime<Utc>) -> Result<(), String> {
    if !DateKey::supports(at) {
        return Err(format!("{field} must fall between years 0001 and 9999"));
    }
    Ok(())
}

/// GET /api/entries and /api/full-charges
///
/// `date` selects one day, `start`+`end` a range, otherwise the most recent
/// `limit` records.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub date: Option<DateKey>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

pub enum RecordSelection {
    Day(DateKey),
    Range(DateTime<Utc>, DateTime<Utc>),
    Recent(usize),
}

impl RecordsQuery {
    pub fn selection(&self, default_limit: usize) -> Result<RecordSelection, String> {
        match (self.date, self.start, self.end) {
            (Some(day), None, None) => Ok(RecordSelection::Day(day)),
            (None, Some(start), Some(end)) => {
                check_instant("start", start)?;
                check_instant("end", end)?;
                if start > end {
                    return Err("start must not be after end".into());
                }
                Ok(RecordSelection::Range(start, end))
            }
            (None, None, None) => Ok(RecordSelection::Recent(self.limit.unwrap_or(default_limit))),
            (None, _, _) => Err("start and end must be given together".into()),
            (Some(_), _, _) => Err("date cannot be combined with start/end".into()),
        }
    }
}

// ============================================================================
// Full charges
// ============================================================================

/// POST /api/full-charges
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFullChargeRequest {
    #[validate(length(min = 1, max = 64, message = "Source must be 1-64 characters"))]
    pub source: String,
    pub date: Option<DateTime<Utc>>,
}

impl CreateFullChargeRequest {
    /// Check-in time, defaulting to `now`.
    pub fn timestamp(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
        let at = self.date.unwrap_or(now);
        check_instant("date", at)?;
        Ok(at)
    }
}

// ============================================================================
// Logs, calendar, insights
// ============================================================================

/// GET /api/logs
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: SortOrder,
}

/// GET /api/calendar?month=YYYY-MM
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub month: String,
}

impl CalendarQuery {
    /// First and last day of the requested month.
    pub fn month_bounds(&self) -> Result<(DateKey, DateKey), String> {
        let invalid = || format!("month '{}' is not in YYYY-MM form", self.month);
        let (year, month) = self.month.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        let first = chrono::NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        Ok((DateKey::from_date(first), DateKey::from_date(next).add_days(-1)))
    }
}

/// GET /api/insights
#[derive(Debug, Default, Deserialize, Validate)]
pub struct InsightsQuery {
    #[validate(range(min = 1, max = 365, message = "days must be 1-365"))]
    pub days: Option<i64>,
}

// ============================================================================
// Responses
// ============================================================================

/// One timeline row: the record plus its kind-prefixed id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogItemResponse {
    pub log_id: String,
    #[serde(flatten)]
    pub item: LogItem,
}

impl From<LogItem> for LogItemResponse {
    fn from(item: LogItem) -> Self {
        Self {
            log_id: item.id(),
            item,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub start: DateKey,
    pub end: DateKey,
    pub steps_available: bool,
    #[serde(flatten)]
    pub report: InsightReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 21, 3, 0, 0).unwrap()
    }

    fn request(body: serde_json::Value) -> CreateEntryRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_entry_request_builds_rest_entry() {
        let alarm = "2025-11-21T03:20:00Z";
        let req = request(json!({
            "negativeFeeling": "Meeting went badly",
            "emotions": [{"name": "anxious", "colorHex": "#ff6b6b"}],
            "topics": ["work", "  "],
            "isSleepDeprived": true,
            "nextTask": "Draft reply",
            "taskDurationMinutes": 20,
            "restActivity": "walk",
            "actionType": "rest",
            "alarmTime": alarm,
        }));
        assert!(req.validate().is_ok());

        let entry = req.into_entry(now()).unwrap();
        assert_eq!(entry.action_type, ActionType::Rest);
        assert_eq!(entry.date, now());
        assert_eq!(entry.sleep, SleepReport::Yes);
        assert_eq!(entry.emotions[0].color_hex, "FF6B6B");
        assert_eq!(entry.topics, vec!["work"]);
        assert_eq!(entry.alarm_time, Some(alarm.parse().unwrap()));
    }

    #[test]
    fn test_create_entry_request_rejects_too_many_emotions() {
        let req = request(json!({
            "negativeFeeling": "x",
            "emotions": [
                {"name": "a", "colorHex": "000000"},
                {"name": "b", "colorHex": "000000"},
                {"name": "c", "colorHex": "000000"},
                {"name": "d", "colorHex": "000000"},
            ],
            "actionType": "quickStart",
        }));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("emotions"));
    }

    #[test]
    fn test_quick_start_cannot_carry_alarm() {
        let req = request(json!({
            "negativeFeeling": "x",
            "actionType": "quickStart",
            "alarmTime": "2025-11-21T04:00:00Z",
        }));
        assert!(req.into_entry(now()).is_err());
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let req = request(json!({
            "negativeFeeling": "x",
            "emotions": [{"name": "sad", "colorHex": "blue"}],
            "actionType": "rest",
        }));
        assert!(req.into_entry(now()).is_err());
    }

    #[test]
    fn test_records_query_selection() {
        let day: DateKey = "2025-11-21".parse().unwrap();
        let by_day = RecordsQuery { date: Some(day), ..Default::default() };
        assert!(matches!(by_day.selection(50), Ok(RecordSelection::Day(d)) if d == day));

        let recent = RecordsQuery::default();
        assert!(matches!(recent.selection(50), Ok(RecordSelection::Recent(50))));

        let half = RecordsQuery { start: Some(now()), ..Default::default() };
        assert!(half.selection(50).is_err());

        let backwards = RecordsQuery {
            start: Some(now()),
            end: Some(now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(backwards.selection(50).is_err());
    }

    #[test]
    fn test_instants_beyond_four_digit_years_are_rejected() {
        let far: DateTime<Utc> = "+262142-12-31T23:59:59Z".parse().unwrap();
        let range = RecordsQuery {
            start: Some(now()),
            end: Some(far),
            ..Default::default()
        };
        assert_eq!(
            range.selection(50).err().as_deref(),
            Some("end must fall between years 0001 and 9999")
        );

        let mut body = json!({"negativeFeeling": "x", "actionType": "rest"});
        body["date"] = json!("+262142-12-31T23:59:59Z");
        assert!(request(body).into_entry(now()).is_err());

        let charge = CreateFullChargeRequest {
            source: "homeScreen".into(),
            date: Some(DateTime::<Utc>::MAX_UTC),
        };
        assert!(charge.timestamp(now()).is_err());
        let charge = CreateFullChargeRequest { source: "homeScreen".into(), date: None };
        assert_eq!(charge.timestamp(now()), Ok(now()));
    }

    #[test]
    fn test_month_bounds() {
        let december = CalendarQuery { month: "2025-12".into() };
        let (first, last) = december.month_bounds().unwrap();
        assert_eq!(first.to_string(), "2025-12-01");
        assert_eq!(last.to_string(), "2025-12-31");

        let february = CalendarQuery { month: "2024-02".into() };
        assert_eq!(february.month_bounds().unwrap().1.to_string(), "2024-02-29");

        for bad in ["2025-13", "2025-1", "25-01", "2025/01", ""] {
            assert!(CalendarQuery { month: bad.into() }.month_bounds().is_err(), "{bad}");
        }
    }
}
