// src/models/streak.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What happened on an active day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDay {
    /// Streak length at the end of that day.
    pub streak: i32,
    /// The streak was broken and restarted on that day.
    pub reset: bool,
}

/// Per-user daily activity state, stored in the 'streaks' table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub user_id: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<NaiveDate>,
    pub total_days_active: i32,
    /// Credits that cover one missed day each.
    pub streak_freezes: i32,
    pub freeze_used_dates: BTreeSet<NaiveDate>,
    /// Activity log used to draw the calendar. Only the calendar window
    /// ending at `last_activity_date` is kept.
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, ActiveDay>,
}

impl StreakState {
    pub fn new(user_id: i64) -> Self {
        StreakState {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            total_days_active: 0,
            streak_freezes: 0,
            freeze_used_dates: BTreeSet::new(),
            days: BTreeMap::new(),
        }
    }
}

/// A fixed streak length with an associated reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub days: i32,
    pub title: &'static str,
    pub reward: &'static str,
    pub icon: &'static str,
}

pub const MILESTONES: &[Milestone] = &[
    Milestone { days: 3, title: "Warming Up", reward: "50 XP", icon: "🔥" },
    Milestone { days: 7, title: "One Week Strong", reward: "150 XP", icon: "📅" },
    Milestone { days: 14, title: "Fortnight Focus", reward: "300 XP", icon: "🎯" },
    Milestone { days: 30, title: "Monthly Master", reward: "1 streak freeze", icon: "🏅" },
    Milestone { days: 60, title: "Habit Builder", reward: "1000 XP", icon: "🧱" },
    Milestone { days: 100, title: "Century", reward: "2 streak freezes", icon: "💯" },
    Milestone { days: 365, title: "Year of Learning", reward: "Legend badge", icon: "👑" },
];

/// A milestone evaluated against one user's streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneView {
    pub days: i32,
    pub title: String,
    pub reward: String,
    pub icon: String,
    /// Current streak is at or above the threshold.
    pub achieved: bool,
    /// Longest streak reached the threshold, even if the current one reset since.
    pub achieved_before: bool,
    /// 0..=100
    pub progress: i32,
    pub remaining: i32,
}

/// Calendar intensity levels.
pub const LEVEL_INACTIVE: u8 = 0;
pub const LEVEL_BROKEN: u8 = 1;
pub const LEVEL_MAINTAINED: u8 = 2;
pub const LEVEL_BONUS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub level: u8,
    pub freeze_used: bool,
}

/// DTO for recording activity. Defaults to today when `date` is absent.
#[derive(Debug, Default, Deserialize)]
pub struct RecordActivityRequest {
    pub date: Option<NaiveDate>,
}
