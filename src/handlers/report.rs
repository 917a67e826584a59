// src/handlers/report.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{error::AppError, models::report::LeaderboardParams, services::Reports};

/// Class report for one exam. Empty exams return zeroed stats.
pub async fn get_report(
    State(reports): State<Arc<Reports>>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(reports.build_report(exam_id).await?))
}

/// Retrieves the top scores for an exam (5 by default).
pub async fn get_leaderboard(
    State(reports): State<Arc<Reports>>,
    Path(exam_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(reports.leaderboard(exam_id, params.limit).await?))
}
