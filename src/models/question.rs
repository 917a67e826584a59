// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Answer-comparison family of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

/// A single question inside an exam definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub text: String,

    /// Serialized as `type` since that is a reserved keyword in Rust.
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Ordered options (e.g., ["Option A", "Option B"]).
    /// Only meaningful for multiple-choice questions.
    #[serde(default)]
    pub options: Vec<String>,

    /// The correct answer value.
    /// For multiple-choice this is one of `options`; for true/false it is
    /// `"true"` or `"false"`.
    pub answer: String,

    /// Explanation or worked solution shown after submission.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// DTO for sending a question to the student (excludes answer and explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}
