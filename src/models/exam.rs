// src/models/exam.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::question::{Question, QuestionType};

/// An exam as published by the question bank.
///
/// Attempts keep their own snapshot of it, so edits after an attempt
/// starts never reach that attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExamDefinition {
    pub id: i64,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Ordered questions.
    #[validate(
        length(min = 1, message = "An exam needs at least one question."),
        custom(function = validate_questions)
    )]
    pub questions: Vec<Question>,

    /// Total time budget in minutes.
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i32,

    /// Minimum score (percent) for a result to count as passed.
    #[validate(range(min = 0, max = 100))]
    pub pass_mark: i32,
}

impl ExamDefinition {
    pub fn duration_seconds(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }

    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for q in questions {
        if !seen.insert(q.id) {
            return Err(ValidationError::new("duplicate_question_id"));
        }
        if q.text.trim().is_empty() {
            return Err(ValidationError::new("question_text_empty"));
        }
        match q.question_type {
            QuestionType::MultipleChoice => {
                if q.options.len() < 2 {
                    return Err(ValidationError::new("multiple_choice_needs_two_options"));
                }
                if !q.options.iter().any(|opt| opt == &q.answer) {
                    return Err(ValidationError::new("answer_not_among_options"));
                }
            }
            QuestionType::TrueFalse => {
                if q.answer != "true" && q.answer != "false" {
                    return Err(ValidationError::new("true_false_answer_invalid"));
                }
            }
            QuestionType::FillBlank => {
                if q.answer.trim().is_empty() {
                    return Err(ValidationError::new("fill_blank_answer_empty"));
                }
            }
        }
    }
    Ok(())
}
