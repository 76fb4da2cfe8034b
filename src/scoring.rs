//! Weighted grade scoring.
//!
//! Weights by score type: exams 50%, quizzes 30%, homework 20%. A category
//! with no entries makes the whole average undefined; it is never treated
//! as a zero score.

use crate::models::ScoreEntry;

pub const EXAM: &str = "exam";
pub const QUIZ: &str = "quiz";
pub const HOMEWORK: &str = "homework";

pub const EXAM_WEIGHT: f64 = 0.5;
pub const QUIZ_WEIGHT: f64 = 0.3;
pub const HOMEWORK_WEIGHT: f64 = 0.2;

/// Arithmetic mean of the entries of one category, `None` when the
/// category is empty.
pub fn category_mean(scores: &[ScoreEntry], score_type: &str) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for entry in scores.iter().filter(|e| e.score_type == score_type) {
        sum += entry.score;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Combined weighted average over a pool of score entries.
///
/// Entries with an unrecognized type are excluded from every category. If
/// any of the three categories is empty the result is undefined, and the
/// record must be excluded from threshold comparisons rather than scored
/// as zero.
pub fn weighted_average(scores: &[ScoreEntry]) -> Option<f64> {
    let exam = category_mean(scores, EXAM)?;
    let quiz = category_mean(scores, QUIZ)?;
    let homework = category_mean(scores, HOMEWORK)?;
    Some(EXAM_WEIGHT * exam + QUIZ_WEIGHT * quiz + HOMEWORK_WEIGHT * homework)
}
