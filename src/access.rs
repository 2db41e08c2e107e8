//! Trial and paid access rules

#[cfg(feature = "python")]
use pyo3::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{QuizError, QuizResult};
use crate::users::UserIdentity;

/// Access state of a user at a point in time
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessStatus {
    pub has_access: bool,
    pub is_paid: bool,
    pub trial_days_left: i64,
}

/// Paid users always have access, others only before their trial ends
pub fn has_access(user: &UserIdentity, now: DateTime<Utc>) -> bool {
    if user.is_paid {
        return true;
    }
    matches!(user.trial_end_date, Some(end) if now < end)
}

/// Whole days until the trial ends, never negative
pub fn trial_days_left(user: &UserIdentity, now: DateTime<Utc>) -> i64 {
    user.trial_end_date
        .map(|end| (end - now).num_days().max(0))
        .unwrap_or(0)
}

pub fn access_status(user: &UserIdentity, now: DateTime<Utc>) -> AccessStatus {
    AccessStatus {
        has_access: has_access(user, now),
        is_paid: user.is_paid,
        trial_days_left: trial_days_left(user, now),
    }
}

/// Gate for quiz-taking and progress views
pub fn require_access(user: &UserIdentity, now: DateTime<Utc>) -> QuizResult<()> {
    if has_access(user, now) {
        Ok(())
    } else {
        Err(QuizError::AccessDenied)
    }
}

// ============= Python Binding =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "access_status")]
pub fn py_access_status(db_path: &str, user_id: i64) -> PyResult<AccessStatus> {
    let conn = crate::db::open_database(db_path)?;
    let user = crate::users::get_user(&conn, user_id)?;
    Ok(access_status(&user, Utc::now()))
}
