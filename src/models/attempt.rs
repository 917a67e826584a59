// src/models/attempt.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::{exam::ExamDefinition, question::PublicQuestion};

/// Submitted answers keyed by question id. Later writes replace earlier ones.
pub type Answers = BTreeMap<i64, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in-progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown attempt status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AttemptStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-progress" => Ok(AttemptStatus::InProgress),
            "submitted" => Ok(AttemptStatus::Submitted),
            "expired" => Ok(AttemptStatus::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for AttemptStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'exam_attempts' table in the database.
/// One student's timed run through one exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub id: Uuid,
    pub student_id: i64,
    pub exam_id: i64,
    pub started_at: DateTime<Utc>,

    /// Copied from the exam when the attempt is issued.
    pub duration_seconds: i64,

    #[sqlx(json)]
    pub answers: Answers,

    #[sqlx(try_from = "String")]
    pub status: AttemptStatus,

    /// The exam as it was when the attempt started.
    #[sqlx(json)]
    pub snapshot: ExamDefinition,

    pub finished_at: Option<DateTime<Utc>>,
}

impl ExamAttempt {
    pub fn new(student_id: i64, exam: &ExamDefinition, now: DateTime<Utc>) -> Self {
        ExamAttempt {
            id: Uuid::new_v4(),
            student_id,
            exam_id: exam.id,
            started_at: now,
            duration_seconds: exam.duration_seconds(),
            answers: Answers::new(),
            status: AttemptStatus::InProgress,
            snapshot: exam.clone(),
            finished_at: None,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::seconds(self.duration_seconds)
    }

    /// `duration_seconds - (now - started_at)`, floored at zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.started_at).num_seconds();
        (self.duration_seconds - elapsed).max(0)
    }

    /// True once an in-progress attempt has no time left.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::InProgress && now >= self.deadline()
    }

    pub fn view(&self, now: DateTime<Utc>) -> AttemptView {
        let remaining_seconds = if self.status.is_terminal() {
            0
        } else {
            self.remaining_seconds(now)
        };

        AttemptView {
            id: self.id,
            exam_id: self.exam_id,
            student_id: self.student_id,
            title: self.snapshot.title.clone(),
            status: self.status,
            started_at: self.started_at,
            duration_seconds: self.duration_seconds,
            remaining_seconds,
            questions: self.snapshot.questions.iter().map(PublicQuestion::from).collect(),
            answers: self.answers.clone(),
        }
    }
}

/// DTO for returning an attempt to the student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: Uuid,
    pub exam_id: i64,
    pub student_id: i64,
    pub title: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub remaining_seconds: i64,
    pub questions: Vec<PublicQuestion>,
    pub answers: Answers,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub student_id: i64,
}

/// DTO for saving one answer while the attempt runs.
#[derive(Debug, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: i64,
    pub value: String,
}

/// DTO for the terminal submit.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    /// Final answers. These take precedence over anything recorded earlier.
    #[serde(default)]
    pub answers: Answers,
}
