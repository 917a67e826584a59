// src/models/mod.rs

pub mod attempt;
pub mod exam;
pub mod exam_result;
pub mod question;
pub mod report;
pub mod streak;
pub mod user;
