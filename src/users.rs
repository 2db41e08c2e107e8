//! User identities: registration, settings and navigation state

#[cfg(feature = "python")]
use pyo3::prelude::*;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::get_quiz;
use crate::error::{QuizError, QuizResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ro,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ro => "ro",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ro" => Ok(Language::Ro),
            other => Err(QuizError::validation(format!("unsupported language '{other}'"))),
        }
    }
}

/// Stored user account
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    /// Opaque credential produced by the caller's password hasher
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub current_quiz_id: Option<i64>,
    pub locked_home_page: Option<String>,
}

impl UserIdentity {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Registration input collected by the web layer
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub language: Language,
}

const USER_COLUMNS: &str = "id, name, phone_number, email, password_hash, language, created_at, trial_end_date, is_paid, current_quiz_id, locked_home_page";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserIdentity> {
    Ok(UserIdentity {
        id: row.get(0)?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        language: row.get(5)?,
        created_at: row.get(6)?,
        trial_end_date: row.get(7)?,
        is_paid: row.get(8)?,
        current_quiz_id: row.get(9)?,
        locked_home_page: row.get(10)?,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn ensure_updated(updated: usize, user_id: i64) -> QuizResult<()> {
    if updated == 0 {
        return Err(QuizError::not_found("User", user_id));
    }
    Ok(())
}

fn email_taken_by_other(conn: &Connection, email: &str, user_id: Option<i64>) -> QuizResult<bool> {
    let owner: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE email = ?1", params![email], |row| row.get(0))
        .optional()?;
    Ok(matches!(owner, Some(id) if Some(id) != user_id))
}

/// End of a trial of `trial_days` whole days starting at `now`
fn trial_end_date(now: DateTime<Utc>, trial_days: i64) -> QuizResult<DateTime<Utc>> {
    if trial_days < 0 {
        return Err(QuizError::validation(format!("trial length must be non-negative, got {trial_days}")));
    }
    Duration::try_days(trial_days)
        .and_then(|length| now.checked_add_signed(length))
        .ok_or_else(|| QuizError::validation(format!("trial length of {trial_days} days is out of range")))
}

/// Create an account with a trial window of `trial_days` starting at `now`
pub fn register_user(
    conn: &Connection,
    new_user: &NewUser,
    now: DateTime<Utc>,
    trial_days: i64,
) -> QuizResult<UserIdentity> {
    let name = new_user.name.trim();
    let phone = new_user.phone_number.trim();
    if name.is_empty() || phone.is_empty() {
        return Err(QuizError::validation("Name and phone number are required"));
    }
    let trial_end = trial_end_date(now, trial_days)?;

    if find_user_by_phone(conn, phone)?.is_some() {
        return Err(QuizError::Constraint("Phone number already registered".to_string()));
    }

    let email = non_blank(new_user.email.as_deref());
    if let Some(email) = &email {
        if email_taken_by_other(conn, email, None)? {
            return Err(QuizError::Constraint("Email already registered".to_string()));
        }
    }

    conn.execute(
        "INSERT INTO users (name, phone_number, email, password_hash, language, created_at, trial_end_date, is_paid)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        params![
            name,
            phone,
            email,
            new_user.password_hash,
            new_user.language.code(),
            now,
            trial_end,
        ],
    )?;

    get_user(conn, conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, user_id: i64) -> QuizResult<UserIdentity> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| QuizError::not_found("User", user_id))
}

pub fn find_user_by_phone(conn: &Connection, phone_number: &str) -> QuizResult<Option<UserIdentity>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = ?1"),
            params![phone_number.trim()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Change or remove (blank) the email address
pub fn update_email(conn: &Connection, user_id: i64, email: Option<&str>) -> QuizResult<()> {
    let email = non_blank(email);
    if let Some(email) = &email {
        if email_taken_by_other(conn, email, Some(user_id))? {
            return Err(QuizError::Constraint("Email already in use".to_string()));
        }
    }
    let updated = conn.execute(
        "UPDATE users SET email = ?1 WHERE id = ?2",
        params![email, user_id],
    )?;
    ensure_updated(updated, user_id)
}

pub fn set_language(conn: &Connection, user_id: i64, language: Language) -> QuizResult<()> {
    let updated = conn.execute(
        "UPDATE users SET language = ?1 WHERE id = ?2",
        params![language.code(), user_id],
    )?;
    ensure_updated(updated, user_id)
}

pub fn set_password_credential(conn: &Connection, user_id: i64, password_hash: &str) -> QuizResult<()> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    ensure_updated(updated, user_id)
}

/// Record a completed payment
pub fn mark_paid(conn: &Connection, user_id: i64) -> QuizResult<()> {
    let updated = conn.execute("UPDATE users SET is_paid = 1 WHERE id = ?1", params![user_id])?;
    ensure_updated(updated, user_id)
}

pub fn set_current_quiz(conn: &Connection, user_id: i64, quiz_id: Option<i64>) -> QuizResult<()> {
    if let Some(quiz_id) = quiz_id {
        get_quiz(conn, quiz_id)?;
    }
    let updated = conn.execute(
        "UPDATE users SET current_quiz_id = ?1 WHERE id = ?2",
        params![quiz_id, user_id],
    )?;
    ensure_updated(updated, user_id)
}

/// Store the navigation state the user pinned as home
pub fn set_home_page(conn: &Connection, user_id: i64, state: &serde_json::Value) -> QuizResult<()> {
    let blob = serde_json::to_string(state)?;
    let updated = conn.execute(
        "UPDATE users SET locked_home_page = ?1 WHERE id = ?2",
        params![blob, user_id],
    )?;
    ensure_updated(updated, user_id)
}

/// Pinned navigation state; an unreadable blob reads as none
pub fn home_page(conn: &Connection, user_id: i64) -> QuizResult<Option<serde_json::Value>> {
    let user = get_user(conn, user_id)?;
    Ok(user
        .locked_home_page
        .and_then(|blob| serde_json::from_str(&blob).ok()))
}

pub fn clear_home_page(conn: &Connection, user_id: i64) -> QuizResult<()> {
    let updated = conn.execute(
        "UPDATE users SET locked_home_page = NULL WHERE id = ?1",
        params![user_id],
    )?;
    ensure_updated(updated, user_id)
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "register_user")]
pub fn py_register_user(
    db_path: &str,
    name: &str,
    phone_number: &str,
    email: Option<&str>,
    password_hash: Option<&str>,
    language: Option<&str>,
    trial_days: Option<i64>,
) -> PyResult<UserIdentity> {
    let conn = crate::db::open_database(db_path)?;
    let new_user = NewUser {
        name: name.to_string(),
        phone_number: phone_number.to_string(),
        email: email.map(str::to_string),
        password_hash: password_hash.map(str::to_string),
        language: language.unwrap_or("en").parse()?,
    };
    let trial_days = trial_days.unwrap_or(crate::config::Settings::default().trial_days);
    Ok(register_user(&conn, &new_user, Utc::now(), trial_days)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "find_user_by_phone")]
pub fn py_find_user_by_phone(db_path: &str, phone_number: &str) -> PyResult<Option<UserIdentity>> {
    let conn = crate::db::open_database(db_path)?;
    Ok(find_user_by_phone(&conn, phone_number)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "mark_paid")]
pub fn py_mark_paid(db_path: &str, user_id: i64) -> PyResult<()> {
    let conn = crate::db::open_database(db_path)?;
    Ok(mark_paid(&conn, user_id)?)
}
