// src/store/mod.rs

//! Persistence seams used by the services.
//!
//! `MemoryStore` backs tests and single-node demos; `PgStore` is the
//! production implementation over PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

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

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Transition applied to a user's streak while the store holds it exclusively.
pub type StreakUpdate<'a> = &'a (dyn Fn(StreakState) -> StreakState + Send + Sync);

/// Builds the result from the final answer set while the store holds the
/// attempt exclusively.
pub type ResultBuilder<'a> = &'a (dyn Fn(&Answers) -> Result<ExamResult, CoreError> + Send + Sync);

/// Exam lookup, owned by the question bank.
#[async_trait]
pub trait ExamCatalog: Send + Sync {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, CoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>, CoreError>;

    async fn find_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamAttempt>, CoreError>;

    /// Inserts `attempt` unless the same student already has an in-progress
    /// attempt for the same exam. Returns whichever attempt is live afterwards.
    async fn insert_attempt_if_absent(
        &self,
        attempt: &ExamAttempt,
    ) -> Result<ExamAttempt, CoreError>;

    /// Upserts one answer. Returns `false` without writing when the attempt
    /// is no longer in progress or its deadline has passed at `now`.
    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: i64,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError>;

    /// Compare-and-set `in-progress -> status` together with the result insert.
    ///
    /// `overlay` is merged over the answers stored at that moment, `build`
    /// scores the merged set, and the result is stored in the same step, so
    /// no acknowledged answer write can fall between scoring and the status
    /// change. Returns `None`, writing nothing, when the attempt was already final.
    async fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        status: AttemptStatus,
        overlay: &Answers,
        finished_at: DateTime<Utc>,
        build: ResultBuilder<'_>,
    ) -> Result<Option<ExamResult>, CoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn find_result_by_attempt(
        &self,
        attempt_id: Uuid,
    ) -> Result<Option<ExamResult>, CoreError>;

    /// All results for an exam in creation order.
    async fn list_results_for_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, CoreError>;
}

#[async_trait]
pub trait StreakStore: Send + Sync {
    async fn load_streak(&self, user_id: i64) -> Result<Option<StreakState>, CoreError>;

    /// Applies `update` to the stored state (zero state when absent) while
    /// no other update for the same user can interleave, and persists it.
    async fn update_streak(
        &self,
        user_id: i64,
        update: StreakUpdate<'_>,
    ) -> Result<StreakState, CoreError>;
}

/// Display names for reports.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn identities(&self, ids: &[i64]) -> Result<HashMap<i64, StudentIdentity>, CoreError>;
}

/// Everything the services need from persistence.
pub trait Store: ExamCatalog + AttemptStore + ResultStore + StreakStore + StudentDirectory {}

impl<T> Store for T where T: ExamCatalog + AttemptStore + ResultStore + StreakStore + StudentDirectory
{}
