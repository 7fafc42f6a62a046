//! Persistence gateway for journal records.
//!
//! Records live under `users/{user}/journals/{dateKey}/{collection}/{id}`.
//! Cross-day reads go through a collection-group query first. When the store
//! answers with one of the configured "index required" codes, the gateway
//! enumerates the date partitions itself, reads them concurrently and
//! evaluates the same query over the merged result, so callers cannot tell
//! which path produced the answer.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::models::record::DATE_FIELD;
use crate::models::{DateKey, JournalRecord};
use crate::store::{
    CollectionPath, Direction, Document, DocumentPath, DocumentStore, ErrorCode, FilterOp, Query,
    StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

pub struct JournalGateway {
    store: Arc<dyn DocumentStore>,
    user_id: String,
    fallback_codes: Vec<ErrorCode>,
}

impl JournalGateway {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        user_id: impl Into<String>,
        fallback_codes: Vec<ErrorCode>,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            fallback_codes,
        }
    }

    fn user_doc(&self) -> DocumentPath {
        CollectionPath::root("users").doc(self.user_id.as_str())
    }

    fn journals(&self) -> CollectionPath {
        self.user_doc().collection("journals")
    }

    fn partition<R: JournalRecord>(&self, day: DateKey) -> CollectionPath {
        self.journals().doc(day.to_string()).collection(R::COLLECTION)
    }

    fn record_path<R: JournalRecord>(&self, day: DateKey, id: &str) -> DocumentPath {
        self.partition::<R>(day).doc(id)
    }

    fn should_fall_back(&self, err: &StoreError) -> bool {
        self.fallback_codes.contains(&err.code)
    }

    /// Writes `record` under its date partition. Saving the same id again
    /// overwrites the previous document.
    pub async fn save<R: JournalRecord>(&self, record: &R) -> GatewayResult<()> {
        record.check().map_err(GatewayError::Invalid)?;

        let path = self.record_path::<R>(record.date_key(), record.id());
        self.store.put(&path, record.to_fields()).await?;
        tracing::info!(path = %path, "Journal record saved");

        // Read-back is diagnostic only; the write already succeeded.
        match self.store.get(&path).await {
            Ok(Some(_)) => tracing::debug!(path = %path, "Saved record confirmed"),
            Ok(None) => tracing::warn!(path = %path, "Saved record not visible on read-back"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Read-back after save failed"),
        }
        Ok(())
    }

    /// Records of one day, newest first.
    pub async fn for_date<R: JournalRecord>(&self, day: DateKey) -> GatewayResult<Vec<R>> {
        let query = Query::new().order_by(DATE_FIELD, Direction::Descending);
        let docs = self.store.query(&self.partition::<R>(day), &query).await?;
        Ok(decode_all(docs))
    }

    /// Records with `start <= timestamp <= end`, newest first.
    pub async fn in_range<R: JournalRecord>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<Vec<R>> {
        if start > end {
            return Ok(Vec::new());
        }

        let query = Query::new()
            .where_field(DATE_FIELD, FilterOp::Ge, start)
            .where_field(DATE_FIELD, FilterOp::Le, end)
            .order_by(DATE_FIELD, Direction::Descending);

        match self
            .store
            .query_group(R::COLLECTION, &self.user_doc(), &query)
            .await
        {
            Ok(docs) => Ok(decode_all(docs)),
            Err(err) if self.should_fall_back(&err) => {
                tracing::warn!(
                    collection = R::COLLECTION,
                    code = %err.code,
                    "Range query needs an index, reading date partitions instead"
                );
                let first = DateKey::from_timestamp(start);
                let last = DateKey::from_timestamp(end);
                let days: Vec<DateKey> = self
                    .partitions()
                    .await?
                    .into_iter()
                    .filter(|day| *day >= first && *day <= last)
                    .collect();
                let docs = self.fan_out::<R>(&days, &query).await;
                Ok(decode_all(docs))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The `limit` most recent records across all days, newest first.
    pub async fn recent<R: JournalRecord>(&self, limit: usize) -> GatewayResult<Vec<R>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = Query::new()
            .order_by(DATE_FIELD, Direction::Descending)
            .limit(limit);

        match self
            .store
            .query_group(R::COLLECTION, &self.user_doc(), &query)
            .await
        {
            Ok(docs) => Ok(decode_all(docs)),
            Err(err) if self.should_fall_back(&err) => {
                tracing::warn!(
                    collection = R::COLLECTION,
                    code = %err.code,
                    limit,
                    "Recent query needs an index, reading date partitions instead"
                );
                let days = self.partitions().await?;
                let docs = self.fan_out::<R>(&days, &query).await;
                Ok(decode_all(docs))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes one record. A missing record is a soft outcome, not an error.
    pub async fn delete<R: JournalRecord>(
        &self,
        id: &str,
        day: DateKey,
    ) -> GatewayResult<DeleteOutcome> {
        let path = self.record_path::<R>(day, id);
        match self.store.delete(&path).await {
            Ok(()) => {
                tracing::info!(path = %path, "Journal record deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) if err.code == ErrorCode::NotFound => {
                tracing::warn!(path = %path, "Delete requested for a record that does not exist");
                Ok(DeleteOutcome::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Every date partition of the user, oldest first.
    async fn partitions(&self) -> GatewayResult<Vec<DateKey>> {
        let docs = self.store.list_documents(&self.journals()).await?;
        let days = docs
            .iter()
            .filter_map(|doc| match doc.id().parse::<DateKey>() {
                Ok(day) => Some(day),
                Err(e) => {
                    tracing::debug!(path = %doc, error = %e, "Skipping non-date partition");
                    None
                }
            })
            .collect();
        Ok(days)
    }

    /// Reads every partition concurrently and evaluates `query` over the
    /// union. Returns only after all reads have finished; a failed
    /// partition is logged and left out.
    async fn fan_out<R: JournalRecord>(&self, days: &[DateKey], query: &Query) -> Vec<Document> {
        let reads = days.iter().map(|day| {
            let partition = self.partition::<R>(*day);
            async move {
                let result = self.store.query(&partition, &Query::new()).await;
                (partition, result)
            }
        });

        let mut merged = Vec::new();
        let mut failed = 0usize;
        for (partition, result) in join_all(reads).await {
            match result {
                Ok(docs) => merged.extend(docs),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(partition = %partition, error = %e, "Partition read failed, omitting it");
                }
            }
        }

        tracing::debug!(
            partitions = days.len(),
            failed,
            documents = merged.len(),
            "Partition fan-out complete"
        );
        query.apply(merged)
    }
}

/// Decodes documents, dropping the ones that do not match the schema.
fn decode_all<R: JournalRecord>(docs: Vec<Document>) -> Vec<R> {
    docs.into_iter()
        .filter_map(|doc| match R::from_fields(&doc.fields) {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::warn!(path = %doc.path, reason = %reason, "Skipping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmotionTag, EntryDraft, FullChargeEntry, JournalEntry, SleepReport};
    use crate::store::{MemoryStore, Value};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    const USER: &str = "default_user";

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()
    }

    fn draft(sleep: SleepReport) -> EntryDraft {
        EntryDraft {
            negative_feeling: "Could not focus".into(),
            emotions: vec![EmotionTag::new("anxious", "FF6B6B").unwrap()],
            topics: vec!["work".into()],
            sleep,
            next_task: "Reply to email".into(),
            task_duration_minutes: 15,
            rest_activity: "walk".into(),
        }
    }

    fn entry_at(at: DateTime<Utc>) -> JournalEntry {
        JournalEntry::quick_start(draft(SleepReport::No), at)
    }

    fn gateway(store: Arc<MemoryStore>) -> JournalGateway {
        JournalGateway::new(store, USER, vec![ErrorCode::FailedPrecondition])
    }

    /// Entries spread over several days at distinct times.
    fn sample_entries() -> Vec<JournalEntry> {
        (0..12)
            .map(|i| entry_at(base() + Duration::hours(i * 9 + 1)))
            .collect()
    }

    async fn seeded(store: Arc<MemoryStore>, entries: &[JournalEntry]) -> JournalGateway {
        let gateway = gateway(store);
        for entry in entries {
            gateway.save(entry).await.unwrap();
        }
        gateway
    }

    fn ids(entries: &[JournalEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_save_then_for_date_returns_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let morning = entry_at(base() + Duration::hours(1));
        let evening = entry_at(base() + Duration::hours(10));
        let gateway = seeded(store, &[morning.clone(), evening.clone()]).await;

        let day = morning.date_key();
        assert_eq!(day, evening.date_key());
        let found: Vec<JournalEntry> = gateway.for_date(day).await.unwrap();
        assert_eq!(found, vec![evening, morning]);

        let empty: Vec<JournalEntry> = gateway.for_date(day.add_days(5)).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_save_twice_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let mut entry = entry_at(base());
        let gateway = seeded(store, &[entry.clone()]).await;

        entry.negative_feeling = "Edited".into();
        gateway.save(&entry).await.unwrap();

        let found: Vec<JournalEntry> = gateway.for_date(entry.date_key()).await.unwrap();
        assert_eq!(found, vec![entry]);
    }

    #[tokio::test]
    async fn test_save_rejects_broken_invariants() {
        let gateway = gateway(Arc::new(MemoryStore::new()));
        let mut entry = entry_at(base());
        entry.emotions = (0..4)
            .map(|i| EmotionTag::new(format!("e{i}"), "000000").unwrap())
            .collect();
        assert!(matches!(
            gateway.save(&entry).await,
            Err(GatewayError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_fallback_matches_indexed_query() {
        let entries = sample_entries();
        let indexed = seeded(
            Arc::new(MemoryStore::with_group_indexes(["entries"])),
            &entries,
        )
        .await;
        let unindexed = seeded(Arc::new(MemoryStore::new()), &entries).await;

        for limit in [1, 5, 12, 50] {
            let primary: Vec<JournalEntry> = indexed.recent(limit).await.unwrap();
            let fallback: Vec<JournalEntry> = unindexed.recent(limit).await.unwrap();
            assert_eq!(primary.len(), limit.min(entries.len()));
            assert_eq!(ids(&primary), ids(&fallback), "limit {limit}");
            assert!(primary.windows(2).all(|w| w[0].date >= w[1].date));
        }
    }

    #[tokio::test]
    async fn test_recent_falls_back_on_injected_index_error() {
        let store = Arc::new(MemoryStore::with_group_indexes(["entries"]));
        let entries = sample_entries();
        let gateway = seeded(store.clone(), &entries).await;
        let expected: Vec<JournalEntry> = gateway.recent(4).await.unwrap();

        store.fail_group("entries", ErrorCode::FailedPrecondition);
        let recovered: Vec<JournalEntry> = gateway.recent(4).await.unwrap();
        assert_eq!(expected, recovered);
    }

    #[tokio::test]
    async fn test_other_error_classes_propagate() {
        let store = Arc::new(MemoryStore::with_group_indexes(["entries"]));
        let gateway = seeded(store.clone(), &sample_entries()).await;

        store.fail_group("entries", ErrorCode::Unavailable);
        let err = gateway.recent::<JournalEntry>(5).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Store(StoreError { code: ErrorCode::Unavailable, .. })
        ));

        let err = gateway
            .in_range::<JournalEntry>(base(), base() + Duration::days(3))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Store(_)));
    }

    #[tokio::test]
    async fn test_fallback_codes_are_configurable() {
        let store = Arc::new(MemoryStore::with_group_indexes(["entries"]));
        let entries = sample_entries();
        for entry in &entries {
            gateway(store.clone()).save(entry).await.unwrap();
        }
        store.fail_group("entries", ErrorCode::Unavailable);

        let tolerant = JournalGateway::new(
            store.clone(),
            USER,
            vec![ErrorCode::FailedPrecondition, ErrorCode::Unavailable],
        );
        let found: Vec<JournalEntry> = tolerant.recent(3).await.unwrap();
        assert_eq!(found.len(), 3);

        let strict = JournalGateway::new(store, USER, vec![]);
        let missing_index = Arc::new(MemoryStore::new());
        let strict_fresh = JournalGateway::new(missing_index, USER, vec![]);
        assert!(strict.recent::<JournalEntry>(3).await.is_err());
        assert!(strict_fresh.recent::<JournalEntry>(3).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_partition_is_omitted_from_fan_out() {
        let store = Arc::new(MemoryStore::new());
        let entries = sample_entries();
        let gateway = seeded(store.clone(), &entries).await;

        let broken_day = entries[0].date_key();
        store.fail_collection(
            gateway.partition::<JournalEntry>(broken_day),
            ErrorCode::Unavailable,
        );

        let found: Vec<JournalEntry> = gateway.recent(100).await.unwrap();
        let expected: Vec<&JournalEntry> = entries
            .iter()
            .filter(|e| e.date_key() != broken_day)
            .collect();
        assert_eq!(found.len(), expected.len());
        assert!(found.iter().all(|e| e.date_key() != broken_day));
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let store = Arc::new(MemoryStore::with_group_indexes(["entries"]));
        let entries = sample_entries();
        let gateway = seeded(store.clone(), &entries).await;

        let mut broken = entries[3].to_fields();
        broken.remove("actionType");
        let path = gateway.record_path::<JournalEntry>(entries[3].date_key(), &entries[3].id);
        store.put(&path, broken).await.unwrap();

        let found: Vec<JournalEntry> = gateway.recent(100).await.unwrap();
        assert_eq!(found.len(), entries.len() - 1);
        assert!(!found.iter().any(|e| e.id == entries[3].id));

        let day: Vec<JournalEntry> = gateway.for_date(entries[3].date_key()).await.unwrap();
        assert!(!day.iter().any(|e| e.id == entries[3].id));
    }

    #[tokio::test]
    async fn test_records_of_other_users_stay_invisible() {
        let store = Arc::new(MemoryStore::with_group_indexes(["entries"]));
        let mine = seeded(store.clone(), &[entry_at(base())]).await;
        let theirs = JournalGateway::new(store, "someone_else", vec![ErrorCode::FailedPrecondition]);
        theirs.save(&entry_at(base() + Duration::hours(1))).await.unwrap();

        let found: Vec<JournalEntry> = mine.recent(10).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_full_charges_use_their_own_collection() {
        let store = Arc::new(MemoryStore::new());
        let gateway = seeded(store, &[entry_at(base())]).await;
        let charge = FullChargeEntry::new("homeScreen", base() + Duration::minutes(30));
        gateway.save(&charge).await.unwrap();

        let charges: Vec<FullChargeEntry> = gateway.recent(10).await.unwrap();
        assert_eq!(charges, vec![charge.clone()]);
        let entries: Vec<JournalEntry> = gateway.for_date(charge.date_key()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_and_soft_not_found() {
        let store = Arc::new(MemoryStore::new());
        let entry = entry_at(base());
        let gateway = seeded(store, &[entry.clone()]).await;

        let outcome = gateway
            .delete::<JournalEntry>(&entry.id, entry.date_key())
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);

        let found: Vec<JournalEntry> = gateway.for_date(entry.date_key()).await.unwrap();
        assert!(!found.iter().any(|e| e.id == entry.id));

        let again = gateway
            .delete::<JournalEntry>(&entry.id, entry.date_key())
            .await
            .unwrap();
        assert_eq!(again, DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_range_decomposes_to_partitions_in_range() {
        let entries = sample_entries();
        let gateway = seeded(Arc::new(MemoryStore::new()), &entries).await;

        let start = base() + Duration::hours(20);
        let end = base() + Duration::hours(60);
        let found: Vec<JournalEntry> = gateway.in_range(start, end).await.unwrap();
        let mut expected: Vec<JournalEntry> = entries
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect();
        expected.sort_by(|a, b| b.date.cmp(&a.date));
        assert_eq!(found, expected);

        let inverted: Vec<JournalEntry> = gateway.in_range(end, start).await.unwrap();
        assert!(inverted.is_empty());
    }

    #[tokio::test]
    async fn test_non_date_partition_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let gateway = seeded(store.clone(), &[entry_at(base())]).await;
        let stray = gateway
            .journals()
            .doc("not-a-date")
            .collection("entries")
            .doc("x");
        let mut fields = entry_at(base()).to_fields();
        fields.insert("id".into(), Value::from("x"));
        store.put(&stray, fields).await.unwrap();

        let found: Vec<JournalEntry> = gateway.recent(10).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn arb_color() -> impl Strategy<Value = String> {
        "[0-9A-F]{6}"
    }

    fn arb_entry() -> impl Strategy<Value = JournalEntry> {
        (
            0i64..(60 * 24 * 40),
            "[a-zA-Z ]{0,40}",
            prop::collection::vec(("[a-z]{1,10}", arb_color()), 0..=3),
            prop::collection::vec("[a-z]{1,12}", 0..=3),
            prop_oneof![
                Just(SleepReport::Yes),
                Just(SleepReport::No),
                Just(SleepReport::Unreported)
            ],
            "[a-zA-Z ]{0,20}",
            0u32..600,
            "[a-zA-Z ]{0,20}",
            prop::option::of(1i64..240),
            any::<bool>(),
        )
            .prop_map(
                |(minute, feeling, emotions, topics, sleep, next_task, duration, rest, alarm, rest_first)| {
                    let at = base() + Duration::minutes(minute);
                    let draft = EntryDraft {
                        negative_feeling: feeling,
                        emotions: emotions
                            .into_iter()
                            .map(|(name, color)| EmotionTag::new(name, &color).unwrap())
                            .collect(),
                        topics,
                        sleep,
                        next_task,
                        task_duration_minutes: duration,
                        rest_activity: rest,
                    };
                    if rest_first {
                        JournalEntry::start_rest(draft, at, alarm.map(|m| at + Duration::minutes(m)))
                    } else {
                        JournalEntry::quick_start(draft, at)
                    }
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_save_then_for_date_preserves_every_field(entry in arb_entry()) {
            let rt = runtime();
            let found: Vec<JournalEntry> = rt.block_on(async {
                let gateway = gateway(Arc::new(MemoryStore::new()));
                gateway.save(&entry).await.unwrap();
                gateway.for_date(entry.date_key()).await.unwrap()
            });
            prop_assert!(found.contains(&entry));
        }

        #[test]
        fn prop_range_query_agrees_across_paths_and_days(
            entries in prop::collection::vec(arb_entry(), 0..30),
            from in 0i64..40,
            span in 0i64..15,
        ) {
            let rt = runtime();
            let start = base() + Duration::days(from) - Duration::hours(9);
            let end = start + Duration::days(span) + Duration::hours(5);

            let (primary, fallback, per_day) = rt.block_on(async {
                let indexed = seeded(
                    Arc::new(MemoryStore::with_group_indexes(["entries"])),
                    &entries,
                )
                .await;
                let unindexed = seeded(Arc::new(MemoryStore::new()), &entries).await;

                let primary: Vec<JournalEntry> = indexed.in_range(start, end).await.unwrap();
                let fallback: Vec<JournalEntry> = unindexed.in_range(start, end).await.unwrap();

                let mut per_day = Vec::new();
                for day in DateKey::from_timestamp(start).days_through(DateKey::from_timestamp(end)) {
                    let found: Vec<JournalEntry> = indexed.for_date(day).await.unwrap();
                    per_day.extend(found.into_iter().filter(|e| e.date >= start && e.date <= end));
                }
                (primary, fallback, per_day)
            });

            prop_assert_eq!(&primary, &fallback);

            let mut expected_ids: Vec<String> = entries
                .iter()
                .filter(|e| e.date >= start && e.date <= end)
                .map(|e| e.id.clone())
                .collect();
            expected_ids.sort();
            let mut primary_ids = ids(&primary);
            primary_ids.sort();
            let mut per_day_ids = ids(&per_day);
            per_day_ids.sort();
            prop_assert_eq!(&primary_ids, &expected_ids);
            prop_assert_eq!(&per_day_ids, &expected_ids);
        }
    }
}
