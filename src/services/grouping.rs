use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DateKey, EmotionTag, FullChargeEntry, JournalEntry, JournalRecord, SleepReport};

/// Picks the newest record of every day. On identical timestamps the record
/// seen first is kept.
pub fn latest_by_date<'a, R, I>(records: I) -> BTreeMap<DateKey, &'a R>
where
    R: JournalRecord,
    I: IntoIterator<Item = &'a R>,
{
    let mut latest: BTreeMap<DateKey, &'a R> = BTreeMap::new();
    for record in records {
        match latest.entry(record.date_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.timestamp() > slot.get().timestamp() {
                    slot.insert(record);
                }
            }
        }
    }
    latest
}

/// What the calendar shows for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayIndicator {
    pub date: DateKey,
    pub entry_count: usize,
    /// From the day's latest entry.
    pub sleep: SleepReport,
    /// From the day's latest entry.
    pub emotions: Vec<EmotionTag>,
    pub full_charged: bool,
}

/// One indicator per day that has an entry or a full charge, oldest first.
pub fn calendar_days(entries: &[JournalEntry], full_charges: &[FullChargeEntry]) -> Vec<DayIndicator> {
    let latest = latest_by_date(entries);
    let charged: BTreeSet<DateKey> = full_charges.iter().map(|c| c.date_key()).collect();

    let mut counts: BTreeMap<DateKey, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.date_key()).or_default() += 1;
    }

    let days: BTreeSet<DateKey> = counts.keys().chain(charged.iter()).copied().collect();
    days.into_iter()
        .map(|date| {
            let representative = latest.get(&date);
            DayIndicator {
                date,
                entry_count: counts.get(&date).copied().unwrap_or(0),
                sleep: representative.map(|e| e.sleep).unwrap_or_default(),
                emotions: representative.map(|e| e.emotions.clone()).unwrap_or_default(),
                full_charged: charged.contains(&date),
            }
        })
        .collect()
}
