//! Cohort and per-learner aggregation.
//!
//! Both statistics pool score entries through the store's grouping query
//! and run them through the scoring engine. They differ on undefined
//! averages: the cohort pass-rate drops them from its numerator while its
//! denominator stays "all known learners", whereas per-class reporting
//! lists every class, undefined or not.

use tracing::warn;

use crate::error::GradeError;
use crate::models::{ClassAverage, CohortStats, LearnerAverage, ScoreEntry};
use crate::repo;
use crate::scoring;
use crate::store::{GroupKey, RecordFilter, RecordStore};

pub const DEFAULT_THRESHOLD: f64 = 70.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pooled weighted average per learner, across all of each learner's
/// records regardless of class.
pub async fn learner_averages(store: &dyn RecordStore) -> Result<Vec<LearnerAverage>, GradeError> {
    let groups = store
        .grouped_scores(GroupKey::Learner, &RecordFilter::default())
        .await?;
    Ok(groups
        .into_iter()
        .map(|group| LearnerAverage {
            learner_id: group.key,
            average: scoring::weighted_average(&group.scores),
            score_count: group.scores.len(),
        })
        .collect())
}

/// Fraction of all known learners whose pooled average strictly exceeds
/// the threshold. Learners with an undefined average cannot reach the
/// numerator but still count in the denominator.
pub async fn cohort_above_threshold(
    store: &dyn RecordStore,
    threshold: f64,
) -> Result<CohortStats, GradeError> {
    let averages = learner_averages(store).await?;
    let learners_above_threshold = averages
        .iter()
        .filter(|a| a.average.is_some_and(|avg| avg > threshold))
        .count() as u64;
    let total_learners = store.distinct_learners().await?.len() as u64;

    if total_learners == 0 {
        warn!("cohort statistic requested on an empty store; reporting zero percentage");
        return Ok(CohortStats {
            total_learners: 0,
            learners_above_threshold: 0,
            percentage: 0.0,
        });
    }

    Ok(CohortStats {
        total_learners,
        learners_above_threshold,
        percentage: round2(learners_above_threshold as f64 / total_learners as f64 * 100.0),
    })
}

/// Weighted average per class for one learner. Every class the learner has
/// a record for appears, with `None` where a category is missing. A
/// learner with no records at all is a `NotFound`, not an empty list.
pub async fn learner_class_averages(
    store: &dyn RecordStore,
    learner_id: i64,
) -> Result<Vec<ClassAverage>, GradeError> {
    let groups = store
        .grouped_scores(GroupKey::Class, &RecordFilter::by_learner(learner_id))
        .await?;
    if groups.is_empty() {
        return Err(GradeError::NotFound);
    }
    Ok(groups
        .into_iter()
        .map(|group| ClassAverage {
            class_id: group.key as i32,
            average: scoring::weighted_average(&group.scores),
        })
        .collect())
}

/// Weighted average for a single `(learner, class)` enrollment. Pools the
/// pair's records since the store never promises the pair is unique.
pub async fn learner_class_average(
    store: &dyn RecordStore,
    learner_id: i64,
    class_id: i32,
) -> Result<Option<f64>, GradeError> {
    let records = repo::find_by_learner(store, learner_id, Some(class_id)).await?;
    let scores: Vec<ScoreEntry> = records.into_iter().flat_map(|r| r.scores).collect();
    Ok(scoring::weighted_average(&scores))
}
