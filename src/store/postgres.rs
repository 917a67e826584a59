// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use super::{
    AttemptStore, ExamCatalog, ResultBuilder, ResultStore, StreakStore, StreakUpdate,
    StudentDirectory,
};
use crate::{
    error::CoreError,
    models::{
        attempt::{Answers, AttemptStatus, ExamAttempt},
        exam::ExamDefinition,
        exam_result::ExamResult,
        question::Question,
        streak::StreakState,
        user::StudentIdentity,
    },
};

const ATTEMPT_COLUMNS: &str = r#"
    id, student_id, exam_id, started_at, duration_seconds,
    answers, status, snapshot, finished_at
"#;

const RESULT_COLUMNS: &str = r#"
    id, attempt_id, student_id, exam_id, score,
    correct_count, wrong_count, blank_count, passed,
    completion_time_seconds, outcomes, created_at
"#;

/// Helper struct for reading rows of the 'exams' table.
#[derive(FromRow)]
struct ExamRow {
    id: i64,
    title: String,
    duration_minutes: i32,
    pass_mark: i32,
    questions: Json<Vec<Question>>,
}

impl From<ExamRow> for ExamDefinition {
    fn from(row: ExamRow) -> Self {
        ExamDefinition {
            id: row.id,
            title: row.title,
            questions: row.questions.0,
            duration_minutes: row.duration_minutes,
            pass_mark: row.pass_mark,
        }
    }
}

/// PostgreSQL-backed store. Every query is built at runtime.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ExamCatalog for PgStore {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, CoreError> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"
            SELECT id, title, duration_minutes, pass_mark, questions
            FROM exams
            WHERE id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", exam_id, e);
            CoreError::from(e)
        })?;

        Ok(row.map(ExamDefinition::from))
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn find_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>, CoreError> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            "SELECT {} FROM exam_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn find_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamAttempt>, CoreError> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            r#"
            SELECT {}
            FROM exam_attempts
            WHERE student_id = $1 AND exam_id = $2 AND status = 'in-progress'
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(student_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn insert_attempt_if_absent(
        &self,
        attempt: &ExamAttempt,
    ) -> Result<ExamAttempt, CoreError> {
        // The partial unique index turns a concurrent second start into a no-op.
        let inserted = sqlx::query(
            r#"
            INSERT INTO exam_attempts
                (id, student_id, exam_id, started_at, duration_seconds, answers, status, snapshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (student_id, exam_id) WHERE status = 'in-progress' DO NOTHING
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.student_id)
        .bind(attempt.exam_id)
        .bind(attempt.started_at)
        .bind(attempt.duration_seconds)
        .bind(Json(&attempt.answers))
        .bind(attempt.status.as_str())
        .bind(Json(&attempt.snapshot))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt: {:?}", e);
            CoreError::from(e)
        })?;

        if inserted.rows_affected() == 1 {
            return Ok(attempt.clone());
        }

        self.find_in_progress(attempt.student_id, attempt.exam_id)
            .await?
            .ok_or_else(|| {
                CoreError::Storage("live attempt vanished during insert".to_string())
            })
    }

    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: i64,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE exam_attempts
            SET answers = answers || jsonb_build_object($2::TEXT, $3::TEXT)
            WHERE id = $1
              AND status = 'in-progress'
              AND started_at + duration_seconds * INTERVAL '1 second' > $4
            "#,
        )
        .bind(attempt_id)
        .bind(question_id.to_string())
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        match self.find_attempt(attempt_id).await? {
            Some(_) => Ok(false),
            None => Err(CoreError::NotFound(format!("Attempt {} not found", attempt_id))),
        }
    }

    async fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        status: AttemptStatus,
        overlay: &Answers,
        finished_at: DateTime<Utc>,
        build: ResultBuilder<'_>,
    ) -> Result<Option<ExamResult>, CoreError> {
        let mut tx = self.pool.begin().await?;

        // The row stays locked until commit; concurrent answer upserts wait
        // and then fail their status check.
        let merged: Option<(Json<Answers>,)> = sqlx::query_as(
            r#"
            UPDATE exam_attempts
            SET status = $2, answers = answers || $3, finished_at = $4
            WHERE id = $1 AND status = 'in-progress'
            RETURNING answers
            "#,
        )
        .bind(attempt_id)
        .bind(status.as_str())
        .bind(Json(overlay))
        .bind(finished_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((answers,)) = merged else {
            tx.rollback().await?;
            return Ok(None);
        };

        let result = match build(&answers.0) {
            Ok(result) => result,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

        sqlx::query(
            r#"
            INSERT INTO exam_results
                (id, attempt_id, student_id, exam_id, score, correct_count, wrong_count,
                 blank_count, passed, completion_time_seconds, outcomes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(result.id)
        .bind(result.attempt_id)
        .bind(result.student_id)
        .bind(result.exam_id)
        .bind(result.score)
        .bind(result.correct_count)
        .bind(result.wrong_count)
        .bind(result.blank_count)
        .bind(result.passed)
        .bind(result.completion_time_seconds)
        .bind(Json(&result.outcomes))
        .bind(result.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam result: {:?}", e);
            CoreError::from(e)
        })?;

        tx.commit().await?;
        Ok(Some(result))
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn find_result_by_attempt(
        &self,
        attempt_id: Uuid,
    ) -> Result<Option<ExamResult>, CoreError> {
        let result = sqlx::query_as::<_, ExamResult>(&format!(
            "SELECT {} FROM exam_results WHERE attempt_id = $1",
            RESULT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_results_for_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, CoreError> {
        let results = sqlx::query_as::<_, ExamResult>(&format!(
            "SELECT {} FROM exam_results WHERE exam_id = $1 ORDER BY seq",
            RESULT_COLUMNS
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list results for exam {}: {:?}", exam_id, e);
            CoreError::from(e)
        })?;

        Ok(results)
    }
}

#[async_trait]
impl StreakStore for PgStore {
    async fn load_streak(&self, user_id: i64) -> Result<Option<StreakState>, CoreError> {
        let row: Option<(Json<StreakState>,)> =
            sqlx::query_as("SELECT state FROM streaks WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(state,)| state.0))
    }

    async fn update_streak(
        &self,
        user_id: i64,
        update: StreakUpdate<'_>,
    ) -> Result<StreakState, CoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO streaks (user_id, state)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(Json(StreakState::new(user_id)))
        .execute(&mut *tx)
        .await?;

        // Row lock serializes same-user updates until commit.
        let (current,): (Json<StreakState>,) =
            sqlx::query_as("SELECT state FROM streaks WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let next = update(current.0);

        sqlx::query("UPDATE streaks SET state = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(Json(&next))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(next)
    }
}

#[async_trait]
impl StudentDirectory for PgStore {
    async fn identities(&self, ids: &[i64]) -> Result<HashMap<i64, StudentIdentity>, CoreError> {
        let rows = sqlx::query_as::<_, StudentIdentity>(
            "SELECT id, username FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|s| (s.id, s)).collect())
    }
}
