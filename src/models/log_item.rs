use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::full_charge::FullChargeEntry;
use super::journal_entry::JournalEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Display-time union of both record kinds. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LogItem {
    Journal(JournalEntry),
    FullCharge(FullChargeEntry),
}

impl LogItem {
    pub fn id(&self) -> String {
        match self {
            LogItem::Journal(entry) => format!("journal_{}", entry.id),
            LogItem::FullCharge(entry) => format!("fullCharge_{}", entry.id),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogItem::Journal(entry) => entry.date,
            LogItem::FullCharge(entry) => entry.date,
        }
    }
}

/// Merges both kinds into one chronological timeline.
pub fn timeline(
    entries: Vec<JournalEntry>,
    full_charges: Vec<FullChargeEntry>,
    order: SortOrder,
) -> Vec<LogItem> {
    let mut items: Vec<LogItem> = entries
        .into_iter()
        .map(LogItem::Journal)
        .chain(full_charges.into_iter().map(LogItem::FullCharge))
        .collect();

    items.sort_by(|a, b| match order {
        SortOrder::Asc => a.timestamp().cmp(&b.timestamp()),
        SortOrder::Desc => b.timestamp().cmp(&a.timestamp()),
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::journal_entry::{EntryDraft, SleepReport};
    use chrono::TimeZone;

    fn entry_at(hour: u32) -> JournalEntry {
        let draft = EntryDraft {
            negative_feeling: "heavy".into(),
            emotions: vec![],
            topics: vec![],
            sleep: SleepReport::Unreported,
            next_task: String::new(),
            task_duration_minutes: 0,
            rest_activity: String::new(),
        };
        JournalEntry::quick_start(draft, Utc.with_ymd_and_hms(2025, 11, 21, hour, 0, 0).unwrap())
    }

    fn charge_at(hour: u32) -> FullChargeEntry {
        FullChargeEntry::new("homeScreen", Utc.with_ymd_and_hms(2025, 11, 21, hour, 0, 0).unwrap())
    }

    #[test]
    fn test_timeline_interleaves_kinds_by_time() {
        let items = timeline(
            vec![entry_at(1), entry_at(5)],
            vec![charge_at(3)],
            SortOrder::Desc,
        );
        let hours: Vec<u32> = items
            .iter()
            .map(|item| chrono::Timelike::hour(&item.timestamp()))
            .collect();
        assert_eq!(hours, vec![5, 3, 1]);
        assert!(matches!(items[1], LogItem::FullCharge(_)));

        let ascending = timeline(vec![entry_at(1), entry_at(5)], vec![charge_at(3)], SortOrder::Asc);
        assert!(matches!(ascending[0], LogItem::Journal(_)));
        assert!(ascending[0].timestamp() < ascending[2].timestamp());
    }

    #[test]
    fn test_log_item_ids_are_prefixed_by_kind() {
        let entry = entry_at(1);
        let charge = charge_at(2);
        assert_eq!(
            LogItem::Journal(entry.clone()).id(),
            format!("journal_{}", entry.id)
        );
        assert_eq!(
            LogItem::FullCharge(charge.clone()).id(),
            format!("fullCharge_{}", charge.id)
        );
    }

    #[test]
    fn test_log_item_serializes_with_kind_tag() {
        let json = serde_json::to_value(LogItem::FullCharge(charge_at(2))).unwrap();
        assert_eq!(json["kind"], "fullCharge");
        assert_eq!(json["source"], "homeScreen");
    }
}
