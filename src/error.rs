//! Error kinds surfaced by the repository and aggregation layers.
//!
//! `NotFound` and `Store` must stay distinguishable all the way to the
//! boundary: the first maps to an absent-result response, the second to a
//! generic failure. An undefined weighted average is not an error at all;
//! it travels as `Option::None`.

use thiserror::Error;

/// A failure inside the record store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying store rejected or failed the operation.
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A stored document could not be decoded into a grade record.
    #[error("malformed stored document: {0}")]
    Decode(#[from] serde_json::Error),

    /// A create payload named neither `learner_id` nor legacy `student_id`.
    #[error("payload carries neither learner_id nor student_id")]
    MissingLearnerId,
}

/// Outcome of a repository or aggregation operation.
#[derive(Debug, Error)]
pub enum GradeError {
    /// No document matched the lookup/update/delete key.
    #[error("no matching grade record")]
    NotFound,

    /// The store adapter failed; not retried here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GradeError {
    /// Returns `true` for the empty-result outcome the boundary renders as
    /// an absent resource rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GradeError::NotFound)
    }
}
