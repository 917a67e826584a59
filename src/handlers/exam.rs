// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::attempt::{RecordAnswerRequest, StartAttemptRequest, SubmitAttemptRequest},
    services::ExamSessions,
};

/// Starts (or resumes) the student's attempt at an exam.
pub async fn start_attempt(
    State(sessions): State<Arc<ExamSessions>>,
    Path(exam_id): Path<i64>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.start_attempt(req.student_id, exam_id).await?;
    Ok(Json(view))
}

/// Returns the attempt with remaining time; questions come without answer keys.
pub async fn get_attempt(
    State(sessions): State<Arc<ExamSessions>>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.get_attempt(attempt_id).await?))
}

/// Saves one answer.
/// * 410 once the attempt is submitted or time is up; the client should go to the result.
pub async fn record_answer(
    State(sessions): State<Arc<ExamSessions>>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    sessions
        .record_answer(attempt_id, req.question_id, &req.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submits the attempt and returns the graded result.
pub async fn submit_attempt(
    State(sessions): State<Arc<ExamSessions>>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = sessions.submit_attempt(attempt_id, req.answers).await?;
    Ok(Json(summary))
}

pub async fn get_result(
    State(sessions): State<Arc<ExamSessions>>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.get_result(attempt_id).await?))
}
