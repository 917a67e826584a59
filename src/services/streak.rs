// src/services/streak.rs

//! Daily-activity streaks, freezes, milestones and the activity calendar.
//!
//! The transition itself is the pure [`apply_activity`]; [`StreakTracker`]
//! only adds persistence and the clock.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::{
    config::CALENDAR_DAYS,
    error::CoreError,
    models::streak::{
        ActiveDay, CalendarDay, LEVEL_BONUS, LEVEL_BROKEN, LEVEL_INACTIVE, LEVEL_MAINTAINED,
        MILESTONES, MilestoneView, StreakState,
    },
    store::Store,
    utils::clock::Clock,
};

/// Which transition `apply_activity` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// Same day as the last activity, or a date before it.
    Unchanged,
    Started,
    Continued,
    FreezeCovered,
    Reset,
}

/// Applies one qualifying activity on `date` to `state`.
///
/// Dates earlier than `last_activity_date` leave the state untouched.
pub fn apply_activity(state: &StreakState, date: NaiveDate) -> (StreakState, ActivityOutcome) {
    let mut next = state.clone();

    let outcome = match state.last_activity_date {
        None => {
            next.current_streak = 1;
            next.total_days_active = 1;
            ActivityOutcome::Started
        }
        Some(last) => match (date - last).num_days() {
            gap if gap <= 0 => return (next, ActivityOutcome::Unchanged),
            1 => {
                next.current_streak += 1;
                next.total_days_active += 1;
                ActivityOutcome::Continued
            }
            2 if state.streak_freezes > 0 => {
                next.current_streak += 1;
                next.streak_freezes -= 1;
                next.freeze_used_dates.insert(last + Duration::days(1));
                next.total_days_active += 1;
                ActivityOutcome::FreezeCovered
            }
            _ => {
                next.current_streak = 1;
                next.total_days_active += 1;
                ActivityOutcome::Reset
            }
        },
    };

    next.longest_streak = next.longest_streak.max(next.current_streak);
    next.last_activity_date = Some(date);
    next.days.insert(
        date,
        ActiveDay {
            streak: next.current_streak,
            reset: outcome == ActivityOutcome::Reset,
        },
    );
    // Days outside the calendar window are never read again.
    let oldest_kept = date - Duration::days(CALENDAR_DAYS - 1);
    next.days = next.days.split_off(&oldest_kept);

    (next, outcome)
}

/// Evaluates every milestone against `state`. Pure read.
pub fn evaluate_milestones(state: &StreakState) -> Vec<MilestoneView> {
    MILESTONES
        .iter()
        .map(|m| MilestoneView {
            days: m.days,
            title: m.title.to_string(),
            reward: m.reward.to_string(),
            icon: m.icon.to_string(),
            achieved: state.current_streak >= m.days,
            achieved_before: state.longest_streak >= m.days,
            progress: (state.current_streak * 100 / m.days).min(100),
            remaining: (m.days - state.current_streak).max(0),
        })
        .collect()
}

/// Decides which active days count as bonus days on the calendar.
pub trait BonusPolicy: Send + Sync {
    fn is_bonus(&self, date: NaiveDate, streak: i32) -> bool;
}

/// No day is ever a bonus day.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBonus;

impl BonusPolicy for NoBonus {
    fn is_bonus(&self, _date: NaiveDate, _streak: i32) -> bool {
        false
    }
}

/// Bonus once the running streak reaches the wrapped number of days.
#[derive(Debug, Clone, Copy)]
pub struct StreakAtLeast(pub i32);

impl BonusPolicy for StreakAtLeast {
    fn is_bonus(&self, _date: NaiveDate, streak: i32) -> bool {
        streak >= self.0
    }
}

/// Classifies the `CALENDAR_DAYS` days ending at `today`, oldest first.
pub fn build_calendar(
    state: &StreakState,
    today: NaiveDate,
    policy: &dyn BonusPolicy,
) -> Vec<CalendarDay> {
    (0..CALENDAR_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let freeze_used = state.freeze_used_dates.contains(&date);
            let level = match state.days.get(&date) {
                Some(day) if day.reset => LEVEL_BROKEN,
                Some(day) if policy.is_bonus(date, day.streak) => LEVEL_BONUS,
                Some(_) => LEVEL_MAINTAINED,
                // A frozen day keeps the streak alive without activity.
                None if freeze_used => LEVEL_MAINTAINED,
                None => LEVEL_INACTIVE,
            };
            CalendarDay {
                date,
                level,
                freeze_used,
            }
        })
        .collect()
}

/// Store-backed streak operations.
pub struct StreakTracker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    bonus: Arc<dyn BonusPolicy>,
}

impl StreakTracker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, bonus: Arc<dyn BonusPolicy>) -> Self {
        StreakTracker {
            store,
            clock,
            bonus,
        }
    }

    /// Records qualifying activity for `user_id` on `date`.
    /// Repeated calls for the same day return the same state.
    pub async fn record_activity(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<StreakState, CoreError> {
        let transition = move |state: StreakState| {
            let (next, outcome) = apply_activity(&state, date);
            if outcome != ActivityOutcome::Unchanged {
                tracing::info!(
                    user_id,
                    %date,
                    ?outcome,
                    current_streak = next.current_streak,
                    "Streak updated"
                );
            }
            next
        };

        self.store.update_streak(user_id, &transition).await
    }

    /// Records activity for the clock's current date.
    pub async fn record_activity_today(&self, user_id: i64) -> Result<StreakState, CoreError> {
        self.record_activity(user_id, self.clock.today()).await
    }

    /// Adds one freeze credit. Paying for it is the caller's business.
    pub async fn buy_freeze(&self, user_id: i64) -> Result<StreakState, CoreError> {
        let add_freeze = |mut state: StreakState| {
            state.streak_freezes += 1;
            state
        };
        let state = self.store.update_streak(user_id, &add_freeze).await?;
        tracing::info!(user_id, freezes = state.streak_freezes, "Streak freeze purchased");
        Ok(state)
    }

    /// Current state; the zero state for users with no activity yet.
    pub async fn get_streak(&self, user_id: i64) -> Result<StreakState, CoreError> {
        Ok(self
            .store
            .load_streak(user_id)
            .await?
            .unwrap_or_else(|| StreakState::new(user_id)))
    }

    pub async fn evaluate_milestones(&self, user_id: i64) -> Result<Vec<MilestoneView>, CoreError> {
        Ok(evaluate_milestones(&self.get_streak(user_id).await?))
    }

    pub async fn build_calendar(&self, user_id: i64) -> Result<Vec<CalendarDay>, CoreError> {
        let state = self.get_streak(user_id).await?;
        Ok(build_calendar(&state, self.clock.today(), self.bonus.as_ref()))
    }
}
