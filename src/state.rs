use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{
        ExamSessions, Reports, StreakTracker,
        streak::{BonusPolicy, NoBonus, StreakAtLeast},
    },
    store::Store,
    utils::clock::Clock,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ExamSessions>,
    pub reports: Arc<Reports>,
    pub streaks: Arc<StreakTracker>,
    pub config: Config,
}

impl AppState {
    /// Wires the services over one store and one clock.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let bonus: Arc<dyn BonusPolicy> = match config.bonus_streak_days {
            Some(days) => Arc::new(StreakAtLeast(days)),
            None => Arc::new(NoBonus),
        };

        let streaks = Arc::new(StreakTracker::new(store.clone(), clock.clone(), bonus));
        let sessions = Arc::new(ExamSessions::new(store.clone(), clock, streaks.clone()));
        let reports = Arc::new(Reports::new(store));

        AppState {
            sessions,
            reports,
            streaks,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<ExamSessions> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<Reports> {
    fn from_ref(state: &AppState) -> Self {
        state.reports.clone()
    }
}

impl FromRef<AppState> for Arc<StreakTracker> {
    fn from_ref(state: &AppState) -> Self {
        state.streaks.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
