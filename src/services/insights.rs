//! Deterministic insight report over a window of journal data.
//!
//! Every section is a plain function of its inputs and degrades to a fixed
//! "not enough data" sentence instead of failing: an empty journal is a
//! normal state for a new user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::grouping::latest_by_date;
use super::steps::StepTotals;
use crate::models::{ActionType, FullChargeEntry, JournalEntry, SleepReport};

pub const NOT_ENOUGH_ENTRIES: &str =
    "Not enough entries yet. Record a few more to see how often hard moments come up.";
pub const NO_EMOTIONS: &str = "No emotions have been recorded yet.";
pub const NO_TOPICS: &str = "No topics have been recorded yet.";
pub const NO_ACTIONS: &str = "No rest or quick-start choices have been recorded yet.";
pub const STEPS_UNAVAILABLE: &str =
    "Step data is unavailable. Allow step-count access to compare activity with sleep.";
pub const NOT_ENOUGH_STEP_DAYS: &str = "No days with 5,000 or more steps in this period yet.";
pub const NO_SLEEP_DEPRIVED_ENTRIES: &str = "No entries were recorded while short on sleep.";
pub const NOT_ENOUGH_FOR_ADVICE: &str =
    "Not enough data for advice yet. Keep recording how you feel and how you rest.";

/// Steps at or above which a day counts as active.
pub const ACTIVE_DAY_STEPS: u64 = 5_000;

const TOP_N: usize = 3;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Everything the analyzer looks at. Borrowed, never modified.
#[derive(Debug, Clone, Copy)]
pub struct InsightWindow<'a> {
    pub entries: &'a [JournalEntry],
    pub full_charges: &'a [FullChargeEntry],
    /// `None` when the step source is unavailable or unauthorised.
    pub steps: Option<&'a StepTotals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub generated_at: DateTime<Utc>,
    pub entry_count: usize,
    pub full_charge_count: usize,
    pub frequency: String,
    pub top_emotions: String,
    pub top_topics: String,
    pub action_balance: String,
    pub step_sleep: String,
    pub sleep_deprived_emotions: String,
    pub advice: String,
}

pub fn analyze(window: InsightWindow<'_>) -> InsightReport {
    InsightReport {
        generated_at: Utc::now(),
        entry_count: window.entries.len(),
        full_charge_count: window.full_charges.len(),
        frequency: describe_frequency(window.entries),
        top_emotions: describe_top_emotions(window.entries),
        top_topics: describe_top_topics(window.entries),
        action_balance: describe_action_balance(window.entries),
        step_sleep: describe_step_sleep(window.steps, window.entries),
        sleep_deprived_emotions: describe_sleep_deprived_emotions(window.entries),
        advice: advice(window.entries, window.full_charges),
    }
}

// ── Frequency ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyStats {
    pub entry_count: usize,
    pub mean_interval_days: f64,
    pub span_days: f64,
}

pub fn frequency_stats(entries: &[JournalEntry]) -> Option<FrequencyStats> {
    if entries.len() < 2 {
        return None;
    }
    let mut stamps: Vec<_> = entries.iter().map(|e| e.date).collect();
    stamps.sort();

    let intervals: Vec<f64> = stamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / MILLIS_PER_DAY)
        .collect();
    let span_days = intervals.iter().sum::<f64>();

    Some(FrequencyStats {
        entry_count: entries.len(),
        mean_interval_days: span_days / intervals.len() as f64,
        span_days,
    })
}

pub fn describe_frequency(entries: &[JournalEntry]) -> String {
    match frequency_stats(entries) {
        None => NOT_ENOUGH_ENTRIES.to_string(),
        Some(stats) => format!(
            "You recorded {} entries over {:.1} days, about one every {:.1} days.",
            stats.entry_count, stats.span_days, stats.mean_interval_days
        ),
    }
}

// ── Histograms ───────────────────────────────────────────────────────────

/// Counts items and returns the `n` most frequent. Equal counts keep the
/// order in which the items were first seen.
pub fn top_counts<'a, I>(items: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for item in items {
        match index.get(item) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(item, counts.len());
                counts.push((item.to_string(), 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

pub fn top_emotions<'a>(entries: impl IntoIterator<Item = &'a JournalEntry>) -> Vec<(String, usize)> {
    top_counts(
        entries
            .into_iter()
            .flat_map(|e| e.emotions.iter().map(|emotion| emotion.name.as_str())),
        TOP_N,
    )
}

pub fn top_topics(entries: &[JournalEntry]) -> Vec<(String, usize)> {
    top_counts(
        entries
            .iter()
            .flat_map(|e| e.topics.iter().map(String::as_str)),
        TOP_N,
    )
}

fn describe_ranking(label: &str, ranking: &[(String, usize)]) -> String {
    let items: Vec<String> = ranking
        .iter()
        .map(|(name, count)| format!("{name} ({count})"))
        .collect();
    format!("{label}: {}.", items.join(", "))
}

pub fn describe_top_emotions(entries: &[JournalEntry]) -> String {
    let ranking = top_emotions(entries);
    if ranking.is_empty() {
        return NO_EMOTIONS.to_string();
    }
    describe_ranking("Most frequent emotions", &ranking)
}

pub fn describe_top_topics(entries: &[JournalEntry]) -> String {
    let ranking = top_topics(entries);
    if ranking.is_empty() {
        return NO_TOPICS.to_string();
    }
    describe_ranking("Most frequent topics", &ranking)
}

// ── Rest vs quick start ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionBalance {
    pub rest: usize,
    pub quick_start: usize,
}

impl ActionBalance {
    pub fn total(&self) -> usize {
        self.rest + self.quick_start
    }

    /// The majority choice and its share in percent; `None` when empty or tied.
    pub fn majority(&self) -> Option<(ActionType, f64)> {
        let total = self.total();
        if total == 0 || self.rest == self.quick_start {
            return None;
        }
        let (action, count) = if self.rest > self.quick_start {
            (ActionType::Rest, self.rest)
        } else {
            (ActionType::QuickStart, self.quick_start)
        };
        Some((action, count as f64 * 100.0 / total as f64))
    }
}

pub fn action_balance(entries: &[JournalEntry]) -> ActionBalance {
    entries
        .iter()
        .fold(ActionBalance::default(), |mut balance, entry| {
            match entry.action_type {
                ActionType::Rest => balance.rest += 1,
                ActionType::QuickStart => balance.quick_start += 1,
            }
            balance
        })
}

pub fn describe_action_balance(entries: &[JournalEntry]) -> String {
    let balance = action_balance(entries);
    if balance.total() == 0 {
        return NO_ACTIONS.to_string();
    }
    match balance.majority() {
        None => format!(
            "You chose to rest and to start right away equally often ({} times each).",
            balance.rest
        ),
        Some((ActionType::Rest, pct)) => format!(
            "You chose to rest first {pct:.0}% of the time ({} of {}).",
            balance.rest,
            balance.total()
        ),
        Some((ActionType::QuickStart, pct)) => format!(
            "You chose to start right away {pct:.0}% of the time ({} of {}).",
            balance.quick_start,
            balance.total()
        ),
    }
}

// ── Steps vs sleep ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSleepStats {
    /// Days with at least [`ACTIVE_DAY_STEPS`] steps.
    pub qualifying_days: usize,
    /// Qualifying days whose latest entry did not report short sleep.
    pub well_rested_days: usize,
}

impl StepSleepStats {
    pub fn well_rested_pct(&self) -> f64 {
        if self.qualifying_days == 0 {
            return 0.0;
        }
        self.well_rested_days as f64 * 100.0 / self.qualifying_days as f64
    }
}

/// Classifies active days by the sleep report of their latest entry. A day
/// without an entry counts as well rested.
pub fn step_sleep_stats(steps: &StepTotals, entries: &[JournalEntry]) -> StepSleepStats {
    let latest = latest_by_date(entries);
    let mut stats = StepSleepStats {
        qualifying_days: 0,
        well_rested_days: 0,
    };
    for (day, &count) in steps {
        if count < ACTIVE_DAY_STEPS {
            continue;
        }
        stats.qualifying_days += 1;
        let deprived = latest
            .get(day)
            .is_some_and(|entry| entry.sleep == SleepReport::Yes);
        if !deprived {
            stats.well_rested_days += 1;
        }
    }
    stats
}

pub fn describe_step_sleep(steps: Option<&StepTotals>, entries: &[JournalEntry]) -> String {
    let Some(steps) = steps else {
        return STEPS_UNAVAILABLE.to_string();
    };
    let stats = step_sleep_stats(steps, entries);
    if stats.qualifying_days == 0 {
        return NOT_ENOUGH_STEP_DAYS.to_string();
    }

    let pct = stats.well_rested_pct();
    let lead = format!(
        "On {} active days you were well rested {pct:.0}% of the time.",
        stats.qualifying_days
    );
    let framing = if pct >= 70.0 {
        "Moving and sleeping well seem to go together for you. Keep both up."
    } else if pct >= 40.0 {
        "Activity and sleep are mixed. Notice whether busy days cut into your rest."
    } else {
        "Active days often come with short sleep. Plan some recovery after busy days."
    };
    format!("{lead} {framing}")
}

// ── Emotions when short on sleep ─────────────────────────────────────────

pub fn describe_sleep_deprived_emotions(entries: &[JournalEntry]) -> String {
    let deprived: Vec<&JournalEntry> = entries
        .iter()
        .filter(|e| e.sleep == SleepReport::Yes)
        .collect();
    if deprived.is_empty() {
        return NO_SLEEP_DEPRIVED_ENTRIES.to_string();
    }
    let ranking = top_emotions(deprived);
    if ranking.is_empty() {
        return NO_EMOTIONS.to_string();
    }
    describe_ranking("When short on sleep you most often felt", &ranking)
}

// ── Rest activity and advice ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestBucket {
    Video,
    Music,
    Walking,
    Nap,
}

impl RestBucket {
    pub const ALL: [RestBucket; 4] = [
        RestBucket::Video,
        RestBucket::Music,
        RestBucket::Walking,
        RestBucket::Nap,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            RestBucket::Video => &["video", "youtube", "movie", "netflix", "動画", "映画"],
            RestBucket::Music => &["music", "song", "playlist", "音楽", "曲"],
            RestBucket::Walking => &["walk", "stroll", "散歩", "歩"],
            RestBucket::Nap => &["nap", "sleep", "昼寝", "仮眠", "寝"],
        }
    }

    pub fn activity(&self) -> &'static str {
        match self {
            RestBucket::Video => "watching videos",
            RestBucket::Music => "listening to music",
            RestBucket::Walking => "going for a walk",
            RestBucket::Nap => "taking a nap",
        }
    }

    /// Buckets whose keywords occur in `text`, case-insensitively.
    pub fn classify(text: &str) -> Vec<RestBucket> {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|bucket| bucket.keywords().iter().any(|k| lowered.contains(k)))
            .collect()
    }
}

pub fn rest_bucket_counts(entries: &[JournalEntry]) -> HashMap<RestBucket, usize> {
    let mut counts = HashMap::new();
    for entry in entries {
        for bucket in RestBucket::classify(&entry.rest_activity) {
            *counts.entry(bucket).or_insert(0) += 1;
        }
    }
    counts
}

/// Most frequent bucket; ties go to the earlier bucket in [`RestBucket::ALL`].
pub fn favorite_rest(entries: &[JournalEntry]) -> Option<RestBucket> {
    let counts = rest_bucket_counts(entries);
    let mut best: Option<(RestBucket, usize)> = None;
    for bucket in RestBucket::ALL {
        let count = counts.get(&bucket).copied().unwrap_or(0);
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((bucket, count));
        }
    }
    best.map(|(bucket, _)| bucket)
}

pub fn advice(entries: &[JournalEntry], full_charges: &[FullChargeEntry]) -> String {
    if entries.is_empty() {
        return NOT_ENOUGH_FOR_ADVICE.to_string();
    }
    let total = entries.len() as f64;
    let sleep_ratio = entries
        .iter()
        .filter(|e| e.sleep == SleepReport::Yes)
        .count() as f64
        / total;
    let recovery_ratio = full_charges.len() as f64 / total;
    let activity = favorite_rest(entries)
        .map(|bucket| bucket.activity())
        .unwrap_or("a short break");

    if sleep_ratio >= 0.5 {
        format!(
            "More than half of your entries came on short sleep. Before reaching for {activity}, try protecting tonight's sleep."
        )
    } else if recovery_ratio < 0.3 {
        format!(
            "Few rests end in a full recharge. Try giving {activity} a little more time, or switch to something different."
        )
    } else if recovery_ratio >= 0.7 {
        format!(
            "Your rests usually end in a full recharge. Keep {activity} in your toolkit, it seems to work for you."
        )
    } else {
        format!(
            "You are recharging steadily. Keep using {activity} and notice which rests help the most."
        )
    }
}
