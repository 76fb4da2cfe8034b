//! Postgres-backed record store.
//!
//! Grade records live in one `gradebook.grades` table with the score list
//! as a JSONB document column, so score entries keep whatever extra fields
//! callers send. Append/remove and the grouped-score query are expressed
//! with JSONB operators to match the adapter contract's set semantics.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::error::{GradeError, StoreError};
use crate::models::{GradePayload, GradeRecord, RecordDraft, ScoreEntry};
use crate::repo;
use crate::store::{GroupKey, RecordFilter, RecordStore, ScoreGroup, ScoreUpdate};

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// WHERE clause for a filter, with placeholders numbered from `first`.
/// Returns an empty string for the match-all filter.
fn where_clause(filter: &RecordFilter, prefix: &str, first: usize) -> String {
    let mut conditions = Vec::new();
    let mut n = first;
    if filter.id.is_some() {
        conditions.push(format!("{prefix}id = ${n}"));
        n += 1;
    }
    if filter.learner_id.is_some() {
        conditions.push(format!("{prefix}learner_id = ${n}"));
        n += 1;
    }
    if filter.class_id.is_some() {
        conditions.push(format!("{prefix}class_id = ${n}"));
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn bind_filter<'q>(
    query: Query<'q, Postgres, PgArguments>,
    filter: &RecordFilter,
) -> Query<'q, Postgres, PgArguments> {
    let mut query = query;
    if let Some(id) = filter.id {
        query = query.bind(id);
    }
    if let Some(learner_id) = filter.learner_id {
        query = query.bind(learner_id);
    }
    if let Some(class_id) = filter.class_id {
        query = query.bind(class_id);
    }
    query
}

fn decode_record(row: &sqlx::postgres::PgRow) -> Result<GradeRecord, StoreError> {
    let scores: serde_json::Value = row.get("scores");
    Ok(GradeRecord {
        id: row.get("id"),
        class_id: row.get("class_id"),
        learner_id: row.get("learner_id"),
        scores: serde_json::from_value(scores)?,
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_one(&self, draft: RecordDraft) -> Result<Uuid, StoreError> {
        let scores = serde_json::to_value(&draft.scores)?;
        let row = sqlx::query(
            r#"
            INSERT INTO gradebook.grades (class_id, learner_id, scores)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(draft.class_id)
        .bind(draft.learner_id)
        .bind(scores)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<GradeRecord>, StoreError> {
        let sql = format!(
            "SELECT id, class_id, learner_id, scores FROM gradebook.grades{} LIMIT 1",
            where_clause(filter, "", 1)
        );
        let row = bind_filter(sqlx::query(&sql), filter)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_record).transpose()
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>, StoreError> {
        let sql = format!(
            "SELECT id, class_id, learner_id, scores FROM gradebook.grades{}",
            where_clause(filter, "", 1)
        );
        let rows = bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_record).collect()
    }

    async fn update_one(
        &self,
        filter: &RecordFilter,
        update: &ScoreUpdate,
    ) -> Result<u64, StoreError> {
        // Mirrors a document store's updateOne: at most the first matching
        // record is touched, and the matched count is reported even when a
        // remove changed nothing.
        let (assignment, entry) = match update {
            ScoreUpdate::Append(entry) => ("scores = scores || $1::jsonb", entry),
            ScoreUpdate::Remove(entry) => (
                "scores = COALESCE((SELECT jsonb_agg(e) \
                 FROM jsonb_array_elements(scores) AS e WHERE e <> $1::jsonb), '[]'::jsonb)",
                entry,
            ),
        };
        let sql = format!(
            "UPDATE gradebook.grades SET {assignment} \
             WHERE id = (SELECT id FROM gradebook.grades{} LIMIT 1)",
            where_clause(filter, "", 2)
        );
        let value = serde_json::to_value(entry)?;
        let result = bind_filter(sqlx::query(&sql).bind(value), filter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM gradebook.grades \
             WHERE id = (SELECT id FROM gradebook.grades{} LIMIT 1)",
            where_clause(filter, "", 1)
        );
        let result = bind_filter(sqlx::query(&sql), filter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM gradebook.grades{}",
            where_clause(filter, "", 1)
        );
        let result = bind_filter(sqlx::query(&sql), filter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn grouped_scores(
        &self,
        key: GroupKey,
        filter: &RecordFilter,
    ) -> Result<Vec<ScoreGroup>, StoreError> {
        let (key_expr, group_expr) = match key {
            GroupKey::Learner => ("g.learner_id", "g.learner_id"),
            GroupKey::Class => ("g.class_id::bigint", "g.class_id"),
        };
        // LEFT JOIN keeps groups whose records hold zero scores; their
        // pool comes back empty instead of the group disappearing.
        let sql = format!(
            "SELECT {key_expr} AS group_key, \
             COALESCE(jsonb_agg(e.entry) FILTER (WHERE e.entry IS NOT NULL), '[]'::jsonb) AS scores \
             FROM gradebook.grades g \
             LEFT JOIN LATERAL jsonb_array_elements(g.scores) AS e(entry) ON TRUE\
             {} GROUP BY {group_expr} ORDER BY {group_expr}",
            where_clause(filter, "g.", 1)
        );
        let rows = bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let scores: serde_json::Value = row.get("scores");
            groups.push(ScoreGroup {
                key: row.get("group_key"),
                scores: serde_json::from_value(scores)?,
            });
        }
        Ok(groups)
    }

    async fn distinct_learners(&self) -> Result<Vec<i64>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT learner_id FROM gradebook.grades ORDER BY learner_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("learner_id")).collect())
    }
}

/// Insert a small realistic cohort through the repository create path. One
/// payload still uses the legacy `student_id` field and learner 4 has only
/// quiz scores, so seeded data exercises the rename and the
/// undefined-average policy.
pub async fn seed(store: &dyn RecordStore) -> Result<(), GradeError> {
    let payloads = vec![
        GradePayload {
            class_id: 101,
            learner_id: Some(1),
            student_id: None,
            scores: vec![
                ScoreEntry::new("quiz", 80.0),
                ScoreEntry::new("exam", 90.0),
                ScoreEntry::new("homework", 70.0),
            ],
        },
        GradePayload {
            class_id: 102,
            learner_id: Some(1),
            student_id: None,
            scores: vec![
                ScoreEntry::new("quiz", 75.0),
                ScoreEntry::new("exam", 62.0),
                ScoreEntry::new("homework", 88.0),
            ],
        },
        GradePayload {
            class_id: 101,
            learner_id: None,
            student_id: Some(2),
            scores: vec![
                ScoreEntry::new("quiz", 55.0),
                ScoreEntry::new("exam", 48.0),
                ScoreEntry::new("homework", 60.0),
            ],
        },
        GradePayload {
            class_id: 103,
            learner_id: Some(3),
            student_id: None,
            scores: vec![
                ScoreEntry::new("quiz", 92.0),
                ScoreEntry::new("exam", 95.0),
                ScoreEntry::new("homework", 90.0),
            ],
        },
        GradePayload {
            class_id: 103,
            learner_id: Some(4),
            student_id: None,
            scores: vec![ScoreEntry::new("quiz", 60.0)],
        },
    ];

    for payload in payloads {
        repo::create(store, payload).await?;
    }
    Ok(())
}

#[derive(serde::Deserialize)]
struct CsvRow {
    learner_id: i64,
    class_id: i32,
    score_type: String,
    score: f64,
    graded_on: Option<NaiveDate>,
}

/// Bulk score import. Each row appends one entry to the matching
/// `(learner, class)` record, creating the record when absent. Returns the
/// number of entries appended.
pub async fn import_csv(
    store: &dyn RecordStore,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut appended = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let mut entry = ScoreEntry::new(&row.score_type, row.score);
        if let Some(graded_on) = row.graded_on {
            entry
                .extra
                .insert("graded_on".to_string(), graded_on.to_string().into());
        }

        let mut filter = RecordFilter::by_learner(row.learner_id);
        filter.class_id = Some(row.class_id);

        match store.find_one(&filter).await? {
            Some(record) => {
                repo::update_scores(store, record.id, ScoreUpdate::Append(entry)).await?;
            }
            None => {
                repo::create(
                    store,
                    GradePayload {
                        class_id: row.class_id,
                        learner_id: Some(row.learner_id),
                        student_id: None,
                        scores: vec![entry],
                    },
                )
                .await?;
            }
        }
        appended += 1;
    }

    Ok(appended)
}
