// tests/session_tests.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use classroom_backend::{
    config::Config,
    error::CoreError,
    models::{
        attempt::{Answers, AttemptStatus, ExamAttempt},
        exam::ExamDefinition,
        exam_result::{ExamResult, Outcome},
        question::{Question, QuestionType},
        streak::StreakState,
        user::StudentIdentity,
    },
    state::AppState,
    store::{
        AttemptStore, ExamCatalog, MemoryStore, ResultBuilder, ResultStore, StreakStore,
        StreakUpdate, StudentDirectory,
    },
    utils::clock::ManualClock,
};
use tokio::sync::Mutex;
use uuid::Uuid;

const EXAM_ID: i64 = 10;
const STUDENT: i64 = 501;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
}

fn choice(id: i64, answer: &str) -> Question {
    Question {
        id,
        text: format!("Question {}", id),
        question_type: QuestionType::MultipleChoice,
        options: ["A", "B", "C", "X"].iter().map(|s| s.to_string()).collect(),
        answer: answer.to_string(),
        explanation: Some(format!("The answer is {}", answer)),
    }
}

fn abc_exam() -> ExamDefinition {
    ExamDefinition {
        id: EXAM_ID,
        title: "Timber frames".to_string(),
        questions: vec![choice(1, "A"), choice(2, "B"), choice(3, "C")],
        duration_minutes: 30,
        pass_mark: 60,
    }
}

fn answers(values: &[&str]) -> Answers {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as i64 + 1, v.to_string()))
        .collect()
}

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        bind_addr: "127.0.0.1:0".to_string(),
        rust_log: "error".to_string(),
        bonus_streak_days: None,
    }
}

/// Services over a fresh in-memory store with the ABC exam published.
async fn setup() -> (AppState, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    store.put_exam(abc_exam()).await;
    store.put_student(STUDENT, "lin").await;

    let clock = Arc::new(ManualClock::new(start_time()));
    let state = AppState::new(store.clone(), clock.clone(), test_config());
    (state, store, clock)
}

/// Memory store that commits one queued answer write just before the next
/// finalize, after the submitting call has already read the attempt.
#[derive(Default)]
struct LateWriteStore {
    inner: MemoryStore,
    queued: Mutex<Option<(i64, String)>>,
    saved: Mutex<Option<bool>>,
}

#[async_trait]
impl ExamCatalog for LateWriteStore {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, CoreError> {
        self.inner.find_exam(exam_id).await
    }
}

#[async_trait]
impl AttemptStore for LateWriteStore {
    async fn find_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>, CoreError> {
        self.inner.find_attempt(attempt_id).await
    }

    async fn find_in_progress(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamAttempt>, CoreError> {
        self.inner.find_in_progress(student_id, exam_id).await
    }

    async fn insert_attempt_if_absent(
        &self,
        attempt: &ExamAttempt,
    ) -> Result<ExamAttempt, CoreError> {
        self.inner.insert_attempt_if_absent(attempt).await
    }

    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: i64,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        self.inner.upsert_answer(attempt_id, question_id, value, now).await
    }

    async fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        status: AttemptStatus,
        overlay: &Answers,
        finished_at: DateTime<Utc>,
        build: ResultBuilder<'_>,
    ) -> Result<Option<ExamResult>, CoreError> {
        if let Some((question_id, value)) = self.queued.lock().await.take() {
            let saved = self
                .inner
                .upsert_answer(attempt_id, question_id, &value, finished_at)
                .await?;
            *self.saved.lock().await = Some(saved);
        }
        self.inner
            .finalize_attempt(attempt_id, status, overlay, finished_at, build)
            .await
    }
}

#[async_trait]
impl ResultStore for LateWriteStore {
    async fn find_result_by_attempt(
        &self,
        attempt_id: Uuid,
    ) -> Result<Option<ExamResult>, CoreError> {
        self.inner.find_result_by_attempt(attempt_id).await
    }

    async fn list_results_for_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, CoreError> {
        self.inner.list_results_for_exam(exam_id).await
    }
}

#[async_trait]
impl StreakStore for LateWriteStore {
    async fn load_streak(&self, user_id: i64) -> Result<Option<StreakState>, CoreError> {
        self.inner.load_streak(user_id).await
    }

    async fn update_streak(
        &self,
        user_id: i64,
        update: StreakUpdate<'_>,
    ) -> Result<StreakState, CoreError> {
        self.inner.update_streak(user_id, update).await
    }
}

#[async_trait]
impl StudentDirectory for LateWriteStore {
    async fn identities(&self, ids: &[i64]) -> Result<HashMap<i64, StudentIdentity>, CoreError> {
        self.inner.identities(ids).await
    }
}

#[tokio::test]
async fn start_attempt_issues_then_resumes() {
    let (state, _store, clock) = setup().await;

    let first = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    assert_eq!(first.status, AttemptStatus::InProgress);
    assert_eq!(first.duration_seconds, 1800);
    assert_eq!(first.remaining_seconds, 1800);
    assert_eq!(first.questions.len(), 3);

    clock.advance(Duration::minutes(5));
    let again = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.remaining_seconds, 1500);
}

#[tokio::test]
async fn start_attempt_rejects_unknown_and_empty_exams() {
    let (state, store, _clock) = setup().await;

    let missing = state.sessions.start_attempt(STUDENT, 999).await;
    assert!(matches!(missing, Err(CoreError::NotFound(_))));

    let mut empty = abc_exam();
    empty.id = 11;
    empty.questions.clear();
    store.put_exam(empty).await;
    let empty = state.sessions.start_attempt(STUDENT, 11).await;
    assert!(matches!(empty, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn start_attempt_rejects_malformed_exam() {
    let (state, store, _clock) = setup().await;

    let mut broken = abc_exam();
    broken.id = 12;
    broken.questions[0].answer = "Q".to_string();
    store.put_exam(broken).await;

    let result = state.sessions.start_attempt(STUDENT, 12).await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn start_attempt_resumes_snapshot_after_exam_turns_malformed() {
    let (state, store, _clock) = setup().await;
    let first = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let mut broken = abc_exam();
    broken.questions[0].answer = "Q".to_string();
    store.put_exam(broken).await;

    let resumed = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    assert_eq!(resumed.id, first.id);
    assert_eq!(resumed.questions.len(), 3);

    state
        .sessions
        .submit_attempt(first.id, answers(&["A", "B", "C"]))
        .await
        .unwrap();

    // A fresh attempt needs a valid definition again.
    let fresh = state.sessions.start_attempt(STUDENT, EXAM_ID).await;
    assert!(matches!(fresh, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn submit_scores_and_persists_once() {
    let (state, store, clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    clock.advance(Duration::minutes(12));
    let summary = state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "B", "X"]))
        .await
        .unwrap();

    assert_eq!(summary.status, AttemptStatus::Submitted);
    assert_eq!(summary.total_questions, 3);
    assert_eq!(summary.result.correct_count, 2);
    assert_eq!(summary.result.wrong_count, 1);
    assert_eq!(summary.result.blank_count, 0);
    assert_eq!(summary.result.score, 67);
    assert!(summary.result.passed);
    assert_eq!(summary.result.completion_time_seconds, 720);
    assert_eq!(summary.result.outcomes[2].outcome, Outcome::Wrong);
    assert_eq!(summary.result.outcomes[2].correct_answer, "C");

    let second = state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "B", "C"]))
        .await;
    assert!(matches!(second, Err(CoreError::AlreadySubmitted)));

    let stored = store.list_results_for_exam(EXAM_ID).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, 67);
}

#[tokio::test]
async fn blank_answer_counts_as_blank() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let summary = state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "", "C"]))
        .await
        .unwrap();

    assert_eq!(summary.result.correct_count, 2);
    assert_eq!(summary.result.wrong_count, 0);
    assert_eq!(summary.result.blank_count, 1);
    assert_eq!(summary.result.score, 67);
    assert!(summary.result.passed);
}

#[tokio::test]
async fn concurrent_submits_produce_one_result() {
    let (state, store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let (a, b) = tokio::join!(
        state.sessions.submit_attempt(attempt.id, answers(&["A", "B", "C"])),
        state.sessions.submit_attempt(attempt.id, answers(&["A", "B", "C"])),
    );

    let oks = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1);
    assert!(
        matches!(a, Err(CoreError::AlreadySubmitted)) || matches!(b, Err(CoreError::AlreadySubmitted))
    );
    assert_eq!(store.list_results_for_exam(EXAM_ID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recorded_answers_merge_with_final_payload() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    state.sessions.record_answer(attempt.id, 1, "A").await.unwrap();
    state.sessions.record_answer(attempt.id, 2, "X").await.unwrap();
    // Last write wins for the same question.
    state.sessions.record_answer(attempt.id, 2, "C").await.unwrap();

    let view = state.sessions.get_attempt(attempt.id).await.unwrap();
    assert_eq!(view.answers.get(&2).map(String::as_str), Some("C"));

    // Final payload overrides question 2 and adds question 3.
    let final_answers = Answers::from([(2, "B".to_string()), (3, "C".to_string())]);
    let summary = state
        .sessions
        .submit_attempt(attempt.id, final_answers)
        .await
        .unwrap();
    assert_eq!(summary.result.correct_count, 3);
    assert_eq!(summary.result.score, 100);
}

#[tokio::test]
async fn record_answer_rejects_foreign_question() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let result = state.sessions.record_answer(attempt.id, 42, "A").await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    let result = state
        .sessions
        .submit_attempt(attempt.id, Answers::from([(42, "A".to_string())]))
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn record_answer_after_submit_is_rejected() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    state
        .sessions
        .submit_attempt(attempt.id, Answers::new())
        .await
        .unwrap();

    let result = state.sessions.record_answer(attempt.id, 1, "A").await;
    assert!(matches!(result, Err(CoreError::AttemptExpired)));
}

#[tokio::test]
async fn concurrent_answers_to_one_question_keep_a_single_value() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let (a, b) = tokio::join!(
        state.sessions.record_answer(attempt.id, 1, "A"),
        state.sessions.record_answer(attempt.id, 1, "B"),
    );
    a.unwrap();
    b.unwrap();

    let view = state.sessions.get_attempt(attempt.id).await.unwrap();
    assert_eq!(view.answers.len(), 1);
    let kept = view.answers[&1].clone();
    assert!(kept == "A" || kept == "B");

    // Grading sees the same value the attempt shows.
    let summary = state
        .sessions
        .submit_attempt(attempt.id, Answers::new())
        .await
        .unwrap();
    assert_eq!(summary.result.correct_count, i32::from(kept == "A"));
}

#[tokio::test]
async fn answer_racing_submit_is_either_graded_or_rejected() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let final_answers = Answers::from([(1, "A".to_string()), (2, "B".to_string())]);
    let (recorded, submitted) = tokio::join!(
        state.sessions.record_answer(attempt.id, 3, "C"),
        state.sessions.submit_attempt(attempt.id, final_answers),
    );
    let summary = submitted.unwrap();

    match recorded {
        Ok(()) => assert_eq!(summary.result.correct_count, 3),
        Err(CoreError::AttemptExpired) => assert_eq!(summary.result.correct_count, 2),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn answer_saved_after_submit_read_is_still_graded() {
    let store = Arc::new(LateWriteStore::default());
    store.inner.put_exam(abc_exam()).await;
    let clock = Arc::new(ManualClock::new(start_time()));
    let state = AppState::new(store.clone(), clock.clone(), test_config());

    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    *store.queued.lock().await = Some((3, "C".to_string()));

    let final_answers = Answers::from([(1, "A".to_string()), (2, "B".to_string())]);
    let summary = state
        .sessions
        .submit_attempt(attempt.id, final_answers)
        .await
        .unwrap();

    assert_eq!(*store.saved.lock().await, Some(true));
    assert_eq!(summary.result.correct_count, 3);
    assert_eq!(summary.result.blank_count, 0);
    assert_eq!(summary.result.score, 100);

    let view = state.sessions.get_attempt(attempt.id).await.unwrap();
    assert_eq!(view.answers.get(&3).map(String::as_str), Some("C"));
}

#[tokio::test]
async fn overdue_answer_expires_attempt_with_answers_on_record() {
    let (state, store, clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    state.sessions.record_answer(attempt.id, 1, "A").await.unwrap();

    clock.advance(Duration::minutes(31));
    let result = state.sessions.record_answer(attempt.id, 2, "B").await;
    assert!(matches!(result, Err(CoreError::AttemptExpired)));

    let view = state.sessions.get_attempt(attempt.id).await.unwrap();
    assert_eq!(view.status, AttemptStatus::Expired);
    assert_eq!(view.remaining_seconds, 0);

    let summary = state.sessions.get_result(attempt.id).await.unwrap();
    assert_eq!(summary.status, AttemptStatus::Expired);
    assert_eq!(summary.result.correct_count, 1);
    assert_eq!(summary.result.blank_count, 2);
    assert_eq!(summary.result.completion_time_seconds, 1800);

    // Still exactly one result, and further writes keep failing.
    let again = state.sessions.record_answer(attempt.id, 2, "B").await;
    assert!(matches!(again, Err(CoreError::AttemptExpired)));
    assert_eq!(store.list_results_for_exam(EXAM_ID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn late_submit_drops_payload_and_expires() {
    let (state, _store, clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    state.sessions.record_answer(attempt.id, 1, "A").await.unwrap();

    clock.advance(Duration::hours(2));
    let summary = state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "B", "C"]))
        .await
        .unwrap();
    assert_eq!(summary.status, AttemptStatus::Expired);
    assert_eq!(summary.result.correct_count, 1);

    let again = state.sessions.submit_attempt(attempt.id, Answers::new()).await;
    assert!(matches!(again, Err(CoreError::AlreadySubmitted)));
}

#[tokio::test]
async fn start_after_expiry_finalizes_old_attempt_and_issues_new() {
    let (state, store, clock) = setup().await;
    let first = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    clock.advance(Duration::minutes(45));
    let second = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.status, AttemptStatus::InProgress);

    let old = state.sessions.get_attempt(first.id).await.unwrap();
    assert_eq!(old.status, AttemptStatus::Expired);
    assert_eq!(store.list_results_for_exam(EXAM_ID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn exam_edits_do_not_reach_running_attempt() {
    let (state, store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let mut edited = abc_exam();
    edited.duration_minutes = 1;
    edited.questions[0].answer = "B".to_string();
    store.put_exam(edited).await;

    let view = state.sessions.get_attempt(attempt.id).await.unwrap();
    assert_eq!(view.duration_seconds, 1800);

    let summary = state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "B", "C"]))
        .await
        .unwrap();
    assert_eq!(summary.result.score, 100);
}

#[tokio::test]
async fn result_is_not_available_before_submit() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();

    let result = state.sessions.get_result(attempt.id).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn submit_records_streak_activity() {
    let (state, _store, _clock) = setup().await;
    let attempt = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    state
        .sessions
        .submit_attempt(attempt.id, answers(&["A", "B", "C"]))
        .await
        .unwrap();

    let streak = state.streaks.get_streak(STUDENT).await.unwrap();
    assert_eq!(streak.current_streak, 1);
    assert_eq!(
        streak.last_activity_date,
        Some(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap())
    );
}

#[tokio::test]
async fn report_aggregates_results_in_creation_order() {
    let (state, store, clock) = setup().await;
    store.put_student(502, "mei").await;

    let empty = state.reports.build_report(EXAM_ID).await.unwrap();
    assert_eq!(empty.stats.total_submissions, 0);
    assert_eq!(empty.stats.avg_score, 0.0);
    assert_eq!(empty.stats.passed_count, 0);
    assert!(empty.student_results.is_empty());

    let a = state.sessions.start_attempt(STUDENT, EXAM_ID).await.unwrap();
    state
        .sessions
        .submit_attempt(a.id, answers(&["A", "B", "X"]))
        .await
        .unwrap();

    clock.advance(Duration::minutes(1));
    let b = state.sessions.start_attempt(502, EXAM_ID).await.unwrap();
    state
        .sessions
        .submit_attempt(b.id, answers(&["X", "X", "C"]))
        .await
        .unwrap();

    clock.advance(Duration::minutes(1));
    let c = state.sessions.start_attempt(503, EXAM_ID).await.unwrap();
    state
        .sessions
        .submit_attempt(c.id, answers(&["A", "B", "C"]))
        .await
        .unwrap();

    let report = state.reports.build_report(EXAM_ID).await.unwrap();
    assert_eq!(report.stats.total_submissions, 3);
    assert_eq!(report.stats.passed_count, 2);
    // (67 + 33 + 100) / 3 = 66.67
    assert_eq!(report.stats.avg_score, 66.7);

    let names: Vec<&str> = report
        .student_results
        .iter()
        .map(|r| r.student.username.as_str())
        .collect();
    assert_eq!(names, vec!["lin", "mei", "student-503"]);

    let board = state.reports.leaderboard(EXAM_ID, Some(2)).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].student.id, 503);
    assert_eq!(board[1].student.username, "lin");
}
