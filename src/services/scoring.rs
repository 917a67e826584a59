// src/services/scoring.rs

//! Grading of an answer set against an exam's answer key.
//!
//! Comparison is strict: choice and true/false answers must match the key
//! exactly, including case. Fill-in-the-blank answers are trimmed first and
//! then compared exactly. There is no fuzzy matching.

use validator::Validate;

use crate::{
    error::CoreError,
    models::{
        attempt::Answers,
        exam::ExamDefinition,
        exam_result::{Outcome, QuestionOutcome},
        question::{Question, QuestionType},
    },
};

/// Outcome of grading one answer set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub correct_count: i32,
    pub wrong_count: i32,
    pub blank_count: i32,
    pub total_questions: i32,
    /// `round(100 * correct / total)`
    pub score: i32,
    pub passed: bool,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Grades `answers` against `exam`. Pure.
///
/// Answers for ids that are not in the exam are ignored. A malformed exam
/// yields `CoreError::Validation` rather than a partial score.
pub fn score(exam: &ExamDefinition, answers: &Answers) -> Result<ScoreCard, CoreError> {
    exam.validate()?;

    let mut correct_count = 0;
    let mut wrong_count = 0;
    let mut blank_count = 0;
    let mut outcomes = Vec::with_capacity(exam.questions.len());

    for question in &exam.questions {
        let submitted = answers.get(&question.id);
        let outcome = grade(question, submitted.map(String::as_str));
        match outcome {
            Outcome::Correct => correct_count += 1,
            Outcome::Wrong => wrong_count += 1,
            Outcome::Blank => blank_count += 1,
        }
        outcomes.push(QuestionOutcome {
            question_id: question.id,
            outcome,
            submitted: submitted.cloned(),
            correct_answer: question.answer.clone(),
            explanation: question.explanation.clone(),
        });
    }

    let total_questions = exam.questions.len() as i32;
    let score = percentage(correct_count, total_questions);

    Ok(ScoreCard {
        correct_count,
        wrong_count,
        blank_count,
        total_questions,
        score,
        passed: score >= exam.pass_mark,
        outcomes,
    })
}

/// Grades a single question. Missing or whitespace-only answers are blank.
pub fn grade(question: &Question, submitted: Option<&str>) -> Outcome {
    let Some(value) = submitted.filter(|v| !v.trim().is_empty()) else {
        return Outcome::Blank;
    };

    let matches = match question.question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => value == question.answer,
        QuestionType::FillBlank => value.trim() == question.answer.trim(),
    };

    if matches { Outcome::Correct } else { Outcome::Wrong }
}

fn percentage(correct: i32, total: i32) -> i32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(correct) / f64::from(total)).round() as i32
}
