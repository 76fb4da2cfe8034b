use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Advisory bounds checked at write time. Out-of-range values are logged,
/// never rejected.
pub const CLASS_ID_MIN: i32 = 0;
pub const CLASS_ID_MAX: i32 = 300;
pub const LEARNER_ID_MIN: i64 = 0;

/// One graded item. `score_type` values outside quiz/exam/homework are
/// stored untouched and skipped by the scoring engine. Any extra fields the
/// caller supplies ride along opaquely in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub score_type: String,
    pub score: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ScoreEntry {
    pub fn new(score_type: &str, score: f64) -> Self {
        Self {
            score_type: score_type.to_string(),
            score,
            extra: serde_json::Map::new(),
        }
    }
}

/// One learner's enrollment in one class. Ids are assigned by the store on
/// insert; `(class_id, learner_id)` pairs are not assumed unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: Uuid,
    pub class_id: i32,
    pub learner_id: i64,
    pub scores: Vec<ScoreEntry>,
}

/// A record ready for insertion, after payload normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub class_id: i32,
    pub learner_id: i64,
    pub scores: Vec<ScoreEntry>,
}

/// Create-time wire shape. Legacy clients still send `student_id`; the
/// stored shape always carries `learner_id` and never both.
#[derive(Debug, Clone, Deserialize)]
pub struct GradePayload {
    pub class_id: i32,
    #[serde(default)]
    pub learner_id: Option<i64>,
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

impl GradePayload {
    /// Rename `student_id` to `learner_id` when the canonical field is
    /// absent. A payload naming neither id is malformed.
    pub fn normalize(self) -> Result<RecordDraft, StoreError> {
        let learner_id = self
            .learner_id
            .or(self.student_id)
            .ok_or(StoreError::MissingLearnerId)?;
        Ok(RecordDraft {
            class_id: self.class_id,
            learner_id,
            scores: self.scores,
        })
    }
}

/// An out-of-range id caught by the soft schema check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub field: &'static str,
    pub value: i64,
    pub allowed: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} outside advisory range {}",
            self.field, self.value, self.allowed
        )
    }
}

/// Warn-only range check applied before every insert.
pub fn soft_validate(draft: &RecordDraft) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    if draft.class_id < CLASS_ID_MIN || draft.class_id > CLASS_ID_MAX {
        warnings.push(ValidationWarning {
            field: "class_id",
            value: draft.class_id as i64,
            allowed: format!("[{CLASS_ID_MIN}, {CLASS_ID_MAX}]"),
        });
    }
    if draft.learner_id < LEARNER_ID_MIN {
        warnings.push(ValidationWarning {
            field: "learner_id",
            value: draft.learner_id,
            allowed: format!(">= {LEARNER_ID_MIN}"),
        });
    }
    warnings
}

/// Cohort pass-rate statistic. The denominator counts every distinct
/// learner in the store, including those whose average is undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortStats {
    pub total_learners: u64,
    pub learners_above_threshold: u64,
    pub percentage: f64,
}

/// Per-class weighted average for one learner. `average` is `None` when at
/// least one score category has no entries for that class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class_id: i32,
    pub average: Option<f64>,
}

/// Pooled weighted average for one learner across all enrollments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerAverage {
    pub learner_id: i64,
    pub average: Option<f64>,
    pub score_count: usize,
}
