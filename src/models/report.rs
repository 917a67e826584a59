// src/models/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{exam_result::ExamResult, user::StudentIdentity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_submissions: i64,
    /// Mean score rounded to one decimal; 0 when there are no submissions.
    pub avg_score: f64,
    pub passed_count: i64,
}

/// One result row of a class report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentResult {
    pub student: StudentIdentity,
    #[serde(flatten)]
    pub result: ExamResult,
}

/// Instructor-facing report for one exam.
/// `student_results` keeps creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportView {
    pub exam_id: i64,
    pub stats: ReportStats,
    pub student_results: Vec<StudentResult>,
}

/// Aggregated struct for displaying the leaderboard.
/// One row per student, their best result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub student: StudentIdentity,
    pub score: i32,
    pub completion_time_seconds: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}
