// src/services/session.rs

//! Timed exam attempts: issue, answer, submit.
//!
//! There is no background timer. Every operation on an attempt first checks
//! the deadline and, when it has passed, finalizes the attempt as `expired`
//! with the answers on record before doing anything else.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{scoring, streak::StreakTracker};
use crate::{
    error::CoreError,
    models::{
        attempt::{Answers, AttemptStatus, AttemptView, ExamAttempt},
        exam_result::{ExamResult, ResultSummary},
    },
    store::Store,
    utils::clock::Clock,
};

pub struct ExamSessions {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    streaks: Arc<StreakTracker>,
}

impl ExamSessions {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, streaks: Arc<StreakTracker>) -> Self {
        ExamSessions {
            store,
            clock,
            streaks,
        }
    }

    /// Issues an attempt, or resumes the student's live one for this exam.
    pub async fn start_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<AttemptView, CoreError> {
        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Exam {} not found", exam_id)))?;

        // A live attempt runs on its snapshot, whatever the exam looks like now.
        let now = self.clock.now();
        if let Some(existing) = self.store.find_in_progress(student_id, exam_id).await? {
            if existing.is_overdue(now) {
                self.expire(&existing).await?;
            } else {
                tracing::info!(attempt_id = %existing.id, student_id, exam_id, "Attempt resumed");
                return Ok(existing.view(now));
            }
        }

        if exam.questions.is_empty() {
            return Err(CoreError::NotFound(format!("Exam {} has no questions", exam_id)));
        }
        exam.validate()?;

        let attempt = ExamAttempt::new(student_id, &exam, now);
        let live = self.store.insert_attempt_if_absent(&attempt).await?;
        if live.id == attempt.id {
            tracing::info!(attempt_id = %live.id, student_id, exam_id, "Attempt issued");
        } else {
            tracing::info!(attempt_id = %live.id, student_id, exam_id, "Attempt resumed after concurrent start");
        }

        Ok(live.view(now))
    }

    /// Current view of an attempt, after the deadline check.
    pub async fn get_attempt(&self, attempt_id: Uuid) -> Result<AttemptView, CoreError> {
        let attempt = self.settle(self.load(attempt_id).await?).await?;
        Ok(attempt.view(self.clock.now()))
    }

    /// Saves one answer while the attempt is running. Last write wins.
    ///
    /// Once the attempt is no longer in progress, submitted or expired,
    /// every write fails with `AttemptExpired`.
    pub async fn record_answer(
        &self,
        attempt_id: Uuid,
        question_id: i64,
        value: &str,
    ) -> Result<(), CoreError> {
        let attempt = self.load(attempt_id).await?;
        if attempt.status.is_terminal() {
            return Err(CoreError::AttemptExpired);
        }

        let now = self.clock.now();
        if attempt.is_overdue(now) {
            self.expire(&attempt).await?;
            return Err(CoreError::AttemptExpired);
        }

        if attempt.snapshot.question(question_id).is_none() {
            return Err(CoreError::Validation(format!(
                "Question {} is not part of this exam",
                question_id
            )));
        }

        if self
            .store
            .upsert_answer(attempt_id, question_id, value, now)
            .await?
        {
            return Ok(());
        }

        // Lost a race against a submit or the deadline.
        self.settle(self.load(attempt_id).await?).await?;
        Err(CoreError::AttemptExpired)
    }

    /// Terminal submit. `final_answers` override previously recorded ones.
    ///
    /// A submit arriving after the deadline finalizes the attempt as
    /// `expired` with the answers on record; the late payload is dropped.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        final_answers: Answers,
    ) -> Result<ResultSummary, CoreError> {
        let attempt = self.load(attempt_id).await?;
        if attempt.status.is_terminal() {
            tracing::warn!(%attempt_id, status = %attempt.status, "Duplicate submit rejected");
            return Err(CoreError::AlreadySubmitted);
        }

        let now = self.clock.now();
        if attempt.is_overdue(now) {
            tracing::info!(%attempt_id, "Submit arrived after deadline, expiring attempt");
            return match self.expire(&attempt).await? {
                Some(summary) => Ok(summary),
                None => Err(CoreError::AlreadySubmitted),
            };
        }

        if let Some(unknown) = final_answers
            .keys()
            .find(|id| attempt.snapshot.question(**id).is_none())
        {
            return Err(CoreError::Validation(format!(
                "Question {} is not part of this exam",
                unknown
            )));
        }

        match self
            .finalize(&attempt, AttemptStatus::Submitted, &final_answers, now)
            .await?
        {
            Some(summary) => Ok(summary),
            None => {
                tracing::warn!(%attempt_id, "Concurrent submit lost the race");
                Err(CoreError::AlreadySubmitted)
            }
        }
    }

    /// Result of a finalized attempt.
    pub async fn get_result(&self, attempt_id: Uuid) -> Result<ResultSummary, CoreError> {
        let attempt = self.settle(self.load(attempt_id).await?).await?;
        if !attempt.status.is_terminal() {
            return Err(CoreError::NotFound(format!(
                "Attempt {} has not been submitted yet",
                attempt_id
            )));
        }

        let result = self
            .store
            .find_result_by_attempt(attempt_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Result for attempt {} not found", attempt_id)))?;

        Ok(ResultSummary {
            result,
            status: attempt.status,
            total_questions: attempt.snapshot.questions.len() as i32,
        })
    }

    async fn load(&self, attempt_id: Uuid) -> Result<ExamAttempt, CoreError> {
        self.store
            .find_attempt(attempt_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    /// Applies lazy expiry and returns the attempt as stored afterwards.
    async fn settle(&self, attempt: ExamAttempt) -> Result<ExamAttempt, CoreError> {
        if !attempt.is_overdue(self.clock.now()) {
            return Ok(attempt);
        }
        self.expire(&attempt).await?;
        self.load(attempt.id).await
    }

    /// Forced submission at the deadline with the answers on record.
    async fn expire(&self, attempt: &ExamAttempt) -> Result<Option<ResultSummary>, CoreError> {
        self.finalize(attempt, AttemptStatus::Expired, &Answers::new(), attempt.deadline())
            .await
    }

    /// Merges `overlay` over the stored answers, scores them, and moves the
    /// attempt out of `in-progress` with the result in one store step.
    /// `None` when another caller got there first.
    async fn finalize(
        &self,
        attempt: &ExamAttempt,
        status: AttemptStatus,
        overlay: &Answers,
        ended_at: DateTime<Utc>,
    ) -> Result<Option<ResultSummary>, CoreError> {
        let now = self.clock.now();
        let completion_time_seconds = (ended_at - attempt.started_at)
            .num_seconds()
            .clamp(0, attempt.duration_seconds);

        let build = |answers: &Answers| -> Result<ExamResult, CoreError> {
            let card = scoring::score(&attempt.snapshot, answers)?;
            Ok(ExamResult {
                id: Uuid::new_v4(),
                attempt_id: attempt.id,
                student_id: attempt.student_id,
                exam_id: attempt.exam_id,
                score: card.score,
                correct_count: card.correct_count,
                wrong_count: card.wrong_count,
                blank_count: card.blank_count,
                passed: card.passed,
                completion_time_seconds,
                outcomes: card.outcomes,
                created_at: now,
            })
        };

        let Some(result) = self
            .store
            .finalize_attempt(attempt.id, status, overlay, now, &build)
            .await?
        else {
            return Ok(None);
        };

        tracing::info!(
            attempt_id = %attempt.id,
            student_id = attempt.student_id,
            %status,
            score = result.score,
            passed = result.passed,
            "Attempt finalized"
        );

        // Result is already stored; streak errors are only logged.
        if let Err(e) = self
            .streaks
            .record_activity(attempt.student_id, ended_at.date_naive())
            .await
        {
            tracing::error!("Failed to record streak activity for {}: {:?}", attempt.student_id, e);
        }

        Ok(Some(ResultSummary {
            result,
            status,
            total_questions: attempt.snapshot.questions.len() as i32,
        }))
    }
}
