//! In-memory record store used by unit tests.
//!
//! Keeps the same observable semantics as the Postgres adapter: first-match
//! updates report the matched count even when a remove changed nothing, and
//! grouping retains groups whose records hold zero scores.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{GradeRecord, RecordDraft};
use crate::store::{GroupKey, RecordFilter, RecordStore, ScoreGroup, ScoreUpdate};

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<GradeRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_one(&self, draft: RecordDraft) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.records.lock().unwrap().push(GradeRecord {
            id,
            class_id: draft.class_id,
            learner_id: draft.learner_id,
            scores: draft.scores,
        });
        Ok(id)
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<GradeRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| filter.matches(r)).cloned())
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn update_one(
        &self,
        filter: &RecordFilter,
        update: &ScoreUpdate,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| filter.matches(r)) else {
            return Ok(0);
        };
        match update {
            ScoreUpdate::Append(entry) => record.scores.push(entry.clone()),
            ScoreUpdate::Remove(entry) => record.scores.retain(|e| e != entry),
        }
        Ok(1)
    }

    async fn delete_one(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut records = self.records.lock().unwrap();
        match records.iter().position(|r| filter.matches(r)) {
            Some(index) => {
                records.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn grouped_scores(
        &self,
        key: GroupKey,
        filter: &RecordFilter,
    ) -> Result<Vec<ScoreGroup>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut groups: BTreeMap<i64, ScoreGroup> = BTreeMap::new();
        for record in records.iter().filter(|r| filter.matches(r)) {
            let group_key = match key {
                GroupKey::Learner => record.learner_id,
                GroupKey::Class => record.class_id as i64,
            };
            let group = groups.entry(group_key).or_insert_with(|| ScoreGroup {
                key: group_key,
                scores: Vec::new(),
            });
            group.scores.extend(record.scores.iter().cloned());
        }
        Ok(groups.into_values().collect())
    }

    async fn distinct_learners(&self) -> Result<Vec<i64>, StoreError> {
        let records = self.records.lock().unwrap();
        let learners: BTreeSet<i64> = records.iter().map(|r| r.learner_id).collect();
        Ok(learners.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreEntry;

    fn draft(learner_id: i64, class_id: i32, scores: Vec<ScoreEntry>) -> RecordDraft {
        RecordDraft {
            class_id,
            learner_id,
            scores,
        }
    }

    #[tokio::test]
    async fn remove_deletes_all_structurally_equal_entries() {
        let store = MemoryRecordStore::new();
        let id = store
            .insert_one(draft(
                1,
                101,
                vec![
                    ScoreEntry::new("quiz", 80.0),
                    ScoreEntry::new("quiz", 80.0),
                    ScoreEntry::new("exam", 90.0),
                ],
            ))
            .await
            .unwrap();

        let matched = store
            .update_one(
                &RecordFilter::by_id(id),
                &ScoreUpdate::Remove(ScoreEntry::new("quiz", 80.0)),
            )
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let record = store
            .find_one(&RecordFilter::by_id(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.scores, vec![ScoreEntry::new("exam", 90.0)]);
    }

    #[tokio::test]
    async fn remove_respects_extra_fields() {
        let store = MemoryRecordStore::new();
        let mut tagged = ScoreEntry::new("quiz", 80.0);
        tagged.extra.insert("graded_on".into(), "2026-01-15".into());
        let id = store
            .insert_one(draft(1, 101, vec![tagged.clone()]))
            .await
            .unwrap();

        // Same type and score but no extras: not structurally equal.
        store
            .update_one(
                &RecordFilter::by_id(id),
                &ScoreUpdate::Remove(ScoreEntry::new("quiz", 80.0)),
            )
            .await
            .unwrap();
        let record = store
            .find_one(&RecordFilter::by_id(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.scores, vec![tagged]);
    }

    #[tokio::test]
    async fn grouping_pools_scores_across_classes() {
        let store = MemoryRecordStore::new();
        store
            .insert_one(draft(1, 101, vec![ScoreEntry::new("quiz", 80.0)]))
            .await
            .unwrap();
        store
            .insert_one(draft(1, 102, vec![ScoreEntry::new("exam", 90.0)]))
            .await
            .unwrap();
        store
            .insert_one(draft(2, 101, vec![ScoreEntry::new("quiz", 70.0)]))
            .await
            .unwrap();

        let groups = store
            .grouped_scores(GroupKey::Learner, &RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, 1);
        assert_eq!(groups[0].scores.len(), 2);
        assert_eq!(groups[1].key, 2);
        assert_eq!(groups[1].scores.len(), 1);
    }

    #[tokio::test]
    async fn grouping_keeps_empty_score_records() {
        let store = MemoryRecordStore::new();
        store.insert_one(draft(1, 101, vec![])).await.unwrap();

        let groups = store
            .grouped_scores(GroupKey::Class, &RecordFilter::by_learner(1))
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, 101);
        assert!(groups[0].scores.is_empty());
    }

    #[tokio::test]
    async fn distinct_learners_deduplicates() {
        let store = MemoryRecordStore::new();
        store.insert_one(draft(2, 101, vec![])).await.unwrap();
        store.insert_one(draft(1, 101, vec![])).await.unwrap();
        store.insert_one(draft(1, 102, vec![])).await.unwrap();

        let learners = store.distinct_learners().await.unwrap();
        assert_eq!(learners, vec![1, 2]);
    }
}
