// src/models/exam_result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::attempt::AttemptStatus;

/// How a single question was graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Wrong,
    Blank,
}

/// Per-question line of a graded attempt, used for answer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub outcome: Outcome,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Represents the 'exam_results' table in the database.
/// Written once per attempt when it is submitted or expires; never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub student_id: i64,
    pub exam_id: i64,
    /// Percentage, 0..=100.
    pub score: i32,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub blank_count: i32,
    pub passed: bool,
    pub completion_time_seconds: i64,
    #[sqlx(json)]
    pub outcomes: Vec<QuestionOutcome>,
    pub created_at: DateTime<Utc>,
}

/// DTO returned by submit and result review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    #[serde(flatten)]
    pub result: ExamResult,
    /// `submitted`, or `expired` when the deadline forced the submission.
    pub status: AttemptStatus,
    pub total_questions: i32,
}
