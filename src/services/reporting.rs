// src/services/reporting.rs

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT},
    error::CoreError,
    models::{
        exam_result::ExamResult,
        report::{LeaderboardEntry, ReportStats, ReportView, StudentResult},
        user::StudentIdentity,
    },
    store::Store,
};

/// Class-level statistics over a set of results.
pub fn summarize(results: &[ExamResult]) -> ReportStats {
    let total = results.len() as i64;
    let passed_count = results.iter().filter(|r| r.passed).count() as i64;
    let avg_score = if total == 0 {
        0.0
    } else {
        let sum: i64 = results.iter().map(|r| i64::from(r.score)).sum();
        (sum as f64 / total as f64 * 10.0).round() / 10.0
    };

    ReportStats {
        total_submissions: total,
        avg_score,
        passed_count,
    }
}

/// Best result per student, ordered by score (desc), then completion time
/// (asc), then the student's first submission. At most `limit` entries.
pub fn rank_best(results: &[ExamResult], limit: usize) -> Vec<&ExamResult> {
    let mut best: Vec<&ExamResult> = Vec::new();
    let mut slot: HashMap<i64, usize> = HashMap::new();

    for result in results {
        match slot.get(&result.student_id).copied() {
            Some(i) if !outranks(result, best[i]) => {}
            Some(i) => best[i] = result,
            None => {
                slot.insert(result.student_id, best.len());
                best.push(result);
            }
        }
    }

    // Stable sort keeps first-seen order among exact ties.
    best.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.completion_time_seconds.cmp(&b.completion_time_seconds))
    });
    best.truncate(limit);
    best
}

fn outranks(a: &ExamResult, b: &ExamResult) -> bool {
    (a.score, -a.completion_time_seconds) > (b.score, -b.completion_time_seconds)
}

/// Read-only reports over persisted results.
pub struct Reports {
    store: Arc<dyn Store>,
}

impl Reports {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Reports { store }
    }

    /// Builds the class report for `exam_id`. An exam without results
    /// yields zeroed stats, not an error.
    pub async fn build_report(&self, exam_id: i64) -> Result<ReportView, CoreError> {
        let results = self.store.list_results_for_exam(exam_id).await?;
        let stats = summarize(&results);
        let names = self.identities_for(&results).await?;

        let student_results = results
            .into_iter()
            .map(|result| StudentResult {
                student: identity(&names, result.student_id),
                result,
            })
            .collect();

        tracing::debug!(exam_id, total = stats.total_submissions, "Report built");

        Ok(ReportView {
            exam_id,
            stats,
            student_results,
        })
    }

    /// Top results for `exam_id`. `limit` defaults to 5 and is clamped to 1..=50.
    pub async fn leaderboard(
        &self,
        exam_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, CoreError> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);

        let results = self.store.list_results_for_exam(exam_id).await?;
        let ranked = rank_best(&results, limit);
        let names = self.identities_for(&results).await?;

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i + 1,
                student: identity(&names, r.student_id),
                score: r.score,
                completion_time_seconds: r.completion_time_seconds,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn identities_for(
        &self,
        results: &[ExamResult],
    ) -> Result<HashMap<i64, StudentIdentity>, CoreError> {
        let mut ids: Vec<i64> = results.iter().map(|r| r.student_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.identities(&ids).await
    }
}

fn identity(names: &HashMap<i64, StudentIdentity>, student_id: i64) -> StudentIdentity {
    names
        .get(&student_id)
        .cloned()
        .unwrap_or_else(|| StudentIdentity::unknown(student_id))
}
