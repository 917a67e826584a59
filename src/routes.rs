// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, report, streak},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (exams, attempts, users).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (services).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/{exam_id}/attempts", post(exam::start_attempt))
        .route("/{exam_id}/report", get(report::get_report))
        .route("/{exam_id}/leaderboard", get(report::get_leaderboard));

    let attempt_routes = Router::new()
        .route("/{id}", get(exam::get_attempt))
        .route("/{id}/answers", put(exam::record_answer))
        .route("/{id}/submit", post(exam::submit_attempt))
        .route("/{id}/result", get(exam::get_result));

    let user_routes = Router::new()
        .route("/{user_id}/streak", get(streak::get_streak))
        .route("/{user_id}/streak/activity", post(streak::record_activity))
        .route("/{user_id}/streak/freezes", post(streak::buy_freeze))
        .route("/{user_id}/streak/milestones", get(streak::get_milestones))
        .route("/{user_id}/streak/calendar", get(streak::get_calendar));

    Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/users", user_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
