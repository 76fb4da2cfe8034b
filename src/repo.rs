//! Grade record CRUD over the record store adapter.
//!
//! Lookup misses and unmatched update/delete keys surface as
//! `GradeError::NotFound`; store failures pass through untouched. The
//! create path owns the legacy `student_id` rename and the warn-only range
//! check.

use tracing::warn;
use uuid::Uuid;

use crate::error::GradeError;
use crate::models::{soft_validate, GradePayload, GradeRecord};
use crate::store::{RecordFilter, RecordStore, ScoreUpdate};

/// Normalize, soft-validate and insert a new grade record. Out-of-range
/// ids are logged and the write still goes through.
pub async fn create(store: &dyn RecordStore, payload: GradePayload) -> Result<Uuid, GradeError> {
    let draft = payload.normalize().map_err(GradeError::Store)?;
    for warning in soft_validate(&draft) {
        warn!(%warning, "accepting grade record despite advisory range violation");
    }
    Ok(store.insert_one(draft).await?)
}

pub async fn get_by_id(store: &dyn RecordStore, id: Uuid) -> Result<GradeRecord, GradeError> {
    store
        .find_one(&RecordFilter::by_id(id))
        .await?
        .ok_or(GradeError::NotFound)
}

/// Append or remove one score entry on a record's score list.
pub async fn update_scores(
    store: &dyn RecordStore,
    id: Uuid,
    update: ScoreUpdate,
) -> Result<(), GradeError> {
    let matched = store.update_one(&RecordFilter::by_id(id), &update).await?;
    if matched == 0 {
        return Err(GradeError::NotFound);
    }
    Ok(())
}

pub async fn delete_by_id(store: &dyn RecordStore, id: Uuid) -> Result<(), GradeError> {
    let deleted = store.delete_one(&RecordFilter::by_id(id)).await?;
    if deleted == 0 {
        return Err(GradeError::NotFound);
    }
    Ok(())
}

/// Delete every record a learner has; returns how many were removed.
pub async fn delete_by_learner(
    store: &dyn RecordStore,
    learner_id: i64,
) -> Result<u64, GradeError> {
    let deleted = store
        .delete_many(&RecordFilter::by_learner(learner_id))
        .await?;
    if deleted == 0 {
        return Err(GradeError::NotFound);
    }
    Ok(deleted)
}

pub async fn find_by_learner(
    store: &dyn RecordStore,
    learner_id: i64,
    class_id: Option<i32>,
) -> Result<Vec<GradeRecord>, GradeError> {
    let mut filter = RecordFilter::by_learner(learner_id);
    filter.class_id = class_id;
    let records = store.find(&filter).await?;
    if records.is_empty() {
        return Err(GradeError::NotFound);
    }
    Ok(records)
}

pub async fn find_by_class(
    store: &dyn RecordStore,
    class_id: i32,
    learner_id: Option<i64>,
) -> Result<Vec<GradeRecord>, GradeError> {
    let mut filter = RecordFilter::by_class(class_id);
    filter.learner_id = learner_id;
    let records = store.find(&filter).await?;
    if records.is_empty() {
        return Err(GradeError::NotFound);
    }
    Ok(records)
}
