use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{
    required_array, required_str, required_timestamp, JournalRecord, MalformedRecord, DATE_FIELD,
};
use crate::store::{Fields, Value};

pub const MAX_EMOTIONS: usize = 3;
pub const MAX_TOPICS: usize = 3;

/// A selected emotion and the colour it was shown with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionTag {
    pub name: String,
    /// Six uppercase hex digits, no `#`, no alpha.
    pub color_hex: String,
}

impl EmotionTag {
    pub fn new(name: impl Into<String>, color_hex: &str) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Emotion name must not be empty".into());
        }
        Ok(Self {
            name,
            color_hex: normalize_color_hex(color_hex)?,
        })
    }
}

/// Accepts `RRGGBB` or `#RRGGBB` in either case and returns uppercase `RRGGBB`.
pub fn normalize_color_hex(raw: &str) -> Result<String, String> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Color '{raw}' is not a 6-digit RGB hex value"));
    }
    Ok(hex.to_ascii_uppercase())
}

/// Whether the user reported being short on sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SleepReport {
    Yes,
    No,
    #[default]
    Unreported,
}

impl SleepReport {
    fn stored(self) -> Option<bool> {
        match self {
            SleepReport::Yes => Some(true),
            SleepReport::No => Some(false),
            SleepReport::Unreported => None,
        }
    }

    fn from_stored(value: Option<bool>) -> Self {
        match value {
            Some(true) => SleepReport::Yes,
            Some(false) => SleepReport::No,
            None => SleepReport::Unreported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Rest,
    QuickStart,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Rest => "rest",
            ActionType::QuickStart => "quickStart",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "rest" => Some(ActionType::Rest),
            "quickStart" => Some(ActionType::QuickStart),
            _ => None,
        }
    }
}

/// User-authored part of an entry, shared by both submission paths.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub negative_feeling: String,
    pub emotions: Vec<EmotionTag>,
    pub topics: Vec<String>,
    pub sleep: SleepReport,
    pub next_task: String,
    pub task_duration_minutes: u32,
    pub rest_activity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub negative_feeling: String,
    pub emotions: Vec<EmotionTag>,
    pub topics: Vec<String>,
    pub sleep: SleepReport,
    pub next_task: String,
    pub task_duration_minutes: u32,
    pub rest_activity: String,
    pub alarm_time: Option<DateTime<Utc>>,
    pub action_type: ActionType,
}

impl JournalEntry {
    fn from_draft(
        draft: EntryDraft,
        at: DateTime<Utc>,
        alarm_time: Option<DateTime<Utc>>,
        action_type: ActionType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: at,
            negative_feeling: draft.negative_feeling,
            emotions: draft.emotions,
            topics: draft.topics,
            sleep: draft.sleep,
            next_task: draft.next_task,
            task_duration_minutes: draft.task_duration_minutes,
            rest_activity: draft.rest_activity,
            alarm_time,
            action_type,
        }
    }

    /// Entry for "get going now": no alarm is attached.
    pub fn quick_start(draft: EntryDraft, at: DateTime<Utc>) -> Self {
        Self::from_draft(draft, at, None, ActionType::QuickStart)
    }

    /// Entry for "rest first", optionally with the time to resume.
    pub fn start_rest(
        draft: EntryDraft,
        at: DateTime<Utc>,
        alarm_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self::from_draft(draft, at, alarm_time, ActionType::Rest)
    }
}

impl JournalRecord for JournalEntry {
    const COLLECTION: &'static str = "entries";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn check(&self) -> Result<(), String> {
        if self.emotions.len() > MAX_EMOTIONS {
            return Err(format!("At most {MAX_EMOTIONS} emotions can be selected"));
        }
        if self.topics.len() > MAX_TOPICS {
            return Err(format!("At most {MAX_TOPICS} topics can be selected"));
        }
        for emotion in &self.emotions {
            if emotion.name.trim().is_empty() {
                return Err("Emotion name must not be empty".into());
            }
            // Stored colors must already be canonical to read back unchanged.
            if normalize_color_hex(&emotion.color_hex)? != emotion.color_hex {
                return Err(format!(
                    "Color '{}' must be six uppercase hex digits without '#'",
                    emotion.color_hex
                ));
            }
        }
        Ok(())
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::from(self.id.as_str()));
        fields.insert(DATE_FIELD.into(), Value::from(self.date));
        fields.insert(
            "negativeFeeling".into(),
            Value::from(self.negative_feeling.as_str()),
        );
        let emotions = self
            .emotions
            .iter()
            .map(|emotion| {
                let mut item = Fields::new();
                item.insert("name".into(), Value::from(emotion.name.as_str()));
                item.insert("colorHex".into(), Value::from(emotion.color_hex.as_str()));
                Value::Map(item)
            })
            .collect();
        fields.insert("emotions".into(), Value::Array(emotions));
        fields.insert("topics".into(), Value::from(self.topics.clone()));
        fields.insert("nextTask".into(), Value::from(self.next_task.as_str()));
        fields.insert(
            "taskDurationMinutes".into(),
            Value::Integer(i64::from(self.task_duration_minutes)),
        );
        fields.insert(
            "restActivity".into(),
            Value::from(self.rest_activity.as_str()),
        );
        fields.insert("actionType".into(), Value::from(self.action_type.as_str()));
        if let Some(flag) = self.sleep.stored() {
            fields.insert("isSleepDeprived".into(), Value::from(flag));
        }
        if let Some(alarm) = self.alarm_time {
            fields.insert("alarmTime".into(), Value::from(alarm));
        }
        fields
    }

    fn from_fields(fields: &Fields) -> Result<Self, MalformedRecord> {
        let id = required_str(fields, "id")?;
        let date = required_timestamp(fields, DATE_FIELD)?;
        let negative_feeling = required_str(fields, "negativeFeeling")?;

        // Items without a name or a usable colour are dropped, not fatal.
        let emotions: Vec<EmotionTag> = required_array(fields, "emotions")?
            .iter()
            .filter_map(Value::as_map)
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?;
                let color = item.get("colorHex")?.as_str()?;
                EmotionTag::new(name, color).ok()
            })
            .collect();
        if emotions.len() > MAX_EMOTIONS {
            return Err(MalformedRecord::Invalid {
                field: "emotions",
                reason: format!("{} emotions stored", emotions.len()),
            });
        }

        let topics = required_array(fields, "topics")?
            .iter()
            .map(|topic| {
                topic
                    .as_str()
                    .map(str::to_string)
                    .ok_or(MalformedRecord::WrongType("topics"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if topics.len() > MAX_TOPICS {
            return Err(MalformedRecord::Invalid {
                field: "topics",
                reason: format!("{} topics stored", topics.len()),
            });
        }

        let rest_activity = required_str(fields, "restActivity")?;
        let raw_action = required_str(fields, "actionType")?;
        let action_type = ActionType::parse(&raw_action).ok_or_else(|| MalformedRecord::Invalid {
            field: "actionType",
            reason: format!("unknown action type '{raw_action}'"),
        })?;

        // Older documents predate these fields.
        let next_task = fields
            .get("nextTask")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let task_duration_minutes = fields
            .get("taskDurationMinutes")
            .and_then(Value::as_i64)
            .and_then(|minutes| u32::try_from(minutes).ok())
            .unwrap_or(0);
        let sleep = SleepReport::from_stored(fields.get("isSleepDeprived").and_then(Value::as_bool));
        let alarm_time = fields.get("alarmTime").and_then(Value::as_timestamp);

        Ok(Self {
            id,
            date,
            negative_feeling,
            emotions,
            topics,
            sleep,
            next_task,
            task_duration_minutes,
            rest_activity,
            alarm_time,
            action_type,
        })
    }
}
