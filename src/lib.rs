//! MedQuiz Core - quiz catalog, source import and progress tracking
//!
//! Provides SQLite storage for quizzes, questions, users and attempts, the
//! CSV/workbook importer that populates the catalog, question filtering for
//! quiz sessions, and trial/paid access rules. The `python` feature exposes
//! the same operations to the web layer as a Python extension module.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod fuzzy;
pub mod import;
pub mod progress;
pub mod questions;
pub mod source;
pub mod topics;
pub mod users;
pub mod verify;

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub use access::{access_status, has_access, require_access, trial_days_left, AccessStatus};
pub use config::Settings;
pub use db::{
    delete_quiz, get_questions_filtered, get_quiz, init_database, init_schema, list_active, open_database,
    quiz_summary, set_quiz_beta, QuestionRecord, Quiz, QuizSummary,
};
pub use error::{QuizError, QuizResult};
pub use import::{run_import, ImportDetail, ImportFailure, ImportReport, Importer};
pub use progress::{
    best_score_percentage, history, overall_completion_percentage, progress_summary, quiz_overview,
    record_attempt, AttemptSubmission, ProgressRecord, ProgressSummary, QuizOverview,
};
pub use questions::{project_for_attempt, AnswerKind, AnswerOption, AttemptQuestion, QuestionFilter};
pub use topics::{TopicInfo, TopicTable};
pub use users::{register_user, Language, NewUser, UserIdentity};
pub use verify::{verify_catalog, CatalogVerification};

/// MedQuiz Core Python Module
#[cfg(feature = "python")]
#[pymodule]
fn medquiz_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Catalog
    m.add_function(wrap_pyfunction!(db::py_init_database, m)?)?;
    m.add_function(wrap_pyfunction!(db::py_list_active, m)?)?;
    m.add_function(wrap_pyfunction!(db::py_get_quiz, m)?)?;
    m.add_function(wrap_pyfunction!(db::py_get_questions_filtered, m)?)?;
    m.add_function(wrap_pyfunction!(db::py_quiz_summary, m)?)?;

    // Quiz sessions
    m.add_function(wrap_pyfunction!(questions::py_get_quiz_data, m)?)?;

    // Import
    m.add_function(wrap_pyfunction!(import::py_run_import, m)?)?;

    // Progress tracking
    m.add_function(wrap_pyfunction!(progress::py_record_attempt, m)?)?;
    m.add_function(wrap_pyfunction!(progress::py_best_score_percentage, m)?)?;
    m.add_function(wrap_pyfunction!(progress::py_history, m)?)?;
    m.add_function(wrap_pyfunction!(progress::py_overall_completion_percentage, m)?)?;
    m.add_function(wrap_pyfunction!(progress::py_quiz_overview, m)?)?;
    m.add_function(wrap_pyfunction!(progress::py_progress_summary, m)?)?;

    // Users and access
    m.add_function(wrap_pyfunction!(users::py_register_user, m)?)?;
    m.add_function(wrap_pyfunction!(users::py_find_user_by_phone, m)?)?;
    m.add_function(wrap_pyfunction!(users::py_mark_paid, m)?)?;
    m.add_function(wrap_pyfunction!(access::py_access_status, m)?)?;

    // Register classes
    m.add_class::<db::Quiz>()?;
    m.add_class::<db::QuestionRecord>()?;
    m.add_class::<db::QuizSummary>()?;
    m.add_class::<questions::AnswerOption>()?;
    m.add_class::<questions::AttemptQuestion>()?;
    m.add_class::<progress::ProgressRecord>()?;
    m.add_class::<progress::QuizOverview>()?;
    m.add_class::<progress::ProgressSummary>()?;
    m.add_class::<users::UserIdentity>()?;
    m.add_class::<access::AccessStatus>()?;

    Ok(())
}
