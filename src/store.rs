//! Record store adapter contract.
//!
//! The engine talks to its document store through this trait: plain CRUD
//! plus the two query primitives the aggregation service needs, a grouped
//! score pool and a distinct-learner listing. The Postgres implementation
//! lives in `db`; tests run against the in-memory one in `memory`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{GradeRecord, RecordDraft, ScoreEntry};

/// Lookup key for find/update/delete operations. Unset fields match
/// everything, so the default filter selects the whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub id: Option<Uuid>,
    pub learner_id: Option<i64>,
    pub class_id: Option<i32>,
}

impl RecordFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_learner(learner_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            ..Self::default()
        }
    }

    pub fn by_class(class_id: i32) -> Self {
        Self {
            class_id: Some(class_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &GradeRecord) -> bool {
        self.id.map_or(true, |id| record.id == id)
            && self.learner_id.map_or(true, |l| record.learner_id == l)
            && self.class_id.map_or(true, |c| record.class_id == c)
    }
}

/// Mutation of a record's score list. `Append` adds unconditionally;
/// `Remove` deletes every entry structurally equal to the given one.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreUpdate {
    Append(ScoreEntry),
    Remove(ScoreEntry),
}

/// Grouping axis for the pooled-score query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Learner,
    Class,
}

/// One group out of `grouped_scores`: the key value and every score entry
/// pooled from the group's records. Records with zero scores still
/// produce their group, with an empty pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreGroup {
    pub key: i64,
    pub scores: Vec<ScoreEntry>,
}

/// The document store surface consumed by the repository and the
/// aggregation service. Write failures surface as `StoreError`; match and
/// delete counts are reported so callers can decide what an unmatched key
/// means.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record and return the store-assigned id.
    async fn insert_one(&self, draft: RecordDraft) -> Result<Uuid, StoreError>;

    /// First record matching the filter, if any.
    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<GradeRecord>, StoreError>;

    /// All records matching the filter.
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>, StoreError>;

    /// Apply a score-list mutation to the first matching record; returns
    /// the matched count (0 or 1).
    async fn update_one(
        &self,
        filter: &RecordFilter,
        update: &ScoreUpdate,
    ) -> Result<u64, StoreError>;

    /// Delete the first matching record; returns the deleted count.
    async fn delete_one(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Delete every matching record; returns the deleted count.
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Group matching records by learner or class and pool their scores.
    async fn grouped_scores(
        &self,
        key: GroupKey,
        filter: &RecordFilter,
    ) -> Result<Vec<ScoreGroup>, StoreError>;

    /// Every distinct learner id present in the store.
    async fn distinct_learners(&self) -> Result<Vec<i64>, StoreError>;
}
