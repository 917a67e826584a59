// src/handlers/streak.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::streak::RecordActivityRequest, services::StreakTracker,
};

pub async fn get_streak(
    State(streaks): State<Arc<StreakTracker>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(streaks.get_streak(user_id).await?))
}

/// Records qualifying activity. Without a body (or without `date`) the
/// server's current date is used.
pub async fn record_activity(
    State(streaks): State<Arc<StreakTracker>>,
    Path(user_id): Path<i64>,
    req: Option<Json<RecordActivityRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let date = req.and_then(|Json(r)| r.date);
    let state = match date {
        Some(date) => streaks.record_activity(user_id, date).await?,
        None => streaks.record_activity_today(user_id).await?,
    };
    Ok(Json(state))
}

pub async fn buy_freeze(
    State(streaks): State<Arc<StreakTracker>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(streaks.buy_freeze(user_id).await?))
}

pub async fn get_milestones(
    State(streaks): State<Arc<StreakTracker>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(streaks.evaluate_milestones(user_id).await?))
}

/// Activity calendar for the last 365 days, oldest first.
pub async fn get_calendar(
    State(streaks): State<Arc<StreakTracker>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(streaks.build_calendar(user_id).await?))
}
