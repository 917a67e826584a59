// src/services/mod.rs

pub mod reporting;
pub mod scoring;
pub mod session;
pub mod streak;

pub use reporting::Reports;
pub use session::ExamSessions;
pub use streak::StreakTracker;
