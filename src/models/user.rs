// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display identity of a student, joined from the 'users' table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub id: i64,
    pub username: String,
}

impl StudentIdentity {
    /// Placeholder for results whose owner is no longer in the directory.
    pub fn unknown(id: i64) -> Self {
        StudentIdentity {
            id,
            username: format!("student-{}", id),
        }
    }
}
