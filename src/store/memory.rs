// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
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
        streak::StreakState,
        user::StudentIdentity,
    },
};

#[derive(Default)]
struct Tables {
    exams: HashMap<i64, ExamDefinition>,
    attempts: HashMap<Uuid, ExamAttempt>,
    results: Vec<ExamResult>,
    streaks: HashMap<i64, StreakState>,
    students: HashMap<i64, StudentIdentity>,
}

/// In-process store. A single lock serializes every write, which gives the
/// same per-entity guarantees the SQL store gets from conditional updates.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes or replaces an exam definition.
    pub async fn put_exam(&self, exam: ExamDefinition) {
        self.tables.lock().await.exams.insert(exam.id, exam);
    }

    pub async fn put_student(&self, id: i64, username: &str) {
        self.tables.lock().await.students.insert(
            id,
            StudentIdentity {
                id,
                username: username.to_string(),
            },
        );
    }
}

#[async_trait]
impl ExamCatalog for MemoryStore {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, CoreError> {
        Ok(self.tables.lock().await.exams.get(&exam_id).cloned())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn find_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>, CoreError> {
        Ok(self.tables.lock().await.attempts.get(&attempt_id).cloned())
    }

    async fn find_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamAttempt>, CoreError> {
        let tables = self.tables.lock().await;
        Ok(live_attempt(&tables, student_id, exam_id).cloned())
    }

    async fn insert_attempt_if_absent(
        &self,
        attempt: &ExamAttempt,
    ) -> Result<ExamAttempt, CoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = live_attempt(&tables, attempt.student_id, attempt.exam_id) {
            return Ok(existing.clone());
        }
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt.clone())
    }

    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: i64,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut tables = self.tables.lock().await;
        match tables.attempts.get_mut(&attempt_id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress && now < attempt.deadline() => {
                attempt.answers.insert(question_id, value.to_string());
                Ok(true)
            }
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
        let mut tables = self.tables.lock().await;
        let attempt = tables
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| CoreError::NotFound(format!("Attempt {} not found", attempt_id)))?;

        if attempt.status != AttemptStatus::InProgress {
            return Ok(None);
        }

        let mut answers = attempt.answers.clone();
        answers.extend(overlay.iter().map(|(id, value)| (*id, value.clone())));
        let result = build(&answers)?;

        attempt.status = status;
        attempt.answers = answers;
        attempt.finished_at = Some(finished_at);

        tables.results.push(result.clone());
        Ok(Some(result))
    }
}

fn live_attempt(tables: &Tables, student_id: i64, exam_id: i64) -> Option<&ExamAttempt> {
    tables.attempts.values().find(|a| {
        a.student_id == student_id && a.exam_id == exam_id && a.status == AttemptStatus::InProgress
    })
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn find_result_by_attempt(
        &self,
        attempt_id: Uuid,
    ) -> Result<Option<ExamResult>, CoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.results.iter().find(|r| r.attempt_id == attempt_id).cloned())
    }

    async fn list_results_for_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, CoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .results
            .iter()
            .filter(|r| r.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StreakStore for MemoryStore {
    async fn load_streak(&self, user_id: i64) -> Result<Option<StreakState>, CoreError> {
        Ok(self.tables.lock().await.streaks.get(&user_id).cloned())
    }

    async fn update_streak(
        &self,
        user_id: i64,
        update: StreakUpdate<'_>,
    ) -> Result<StreakState, CoreError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .streaks
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| StreakState::new(user_id));
        let next = update(current);
        tables.streaks.insert(user_id, next.clone());
        Ok(next)
    }
}

#[async_trait]
impl StudentDirectory for MemoryStore {
    async fn identities(&self, ids: &[i64]) -> Result<HashMap<i64, StudentIdentity>, CoreError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.students.get(id).map(|s| (*id, s.clone())))
            .collect())
    }
}
