//! Progress tracking - attempt storage and statistics

#[cfg(feature = "python")]
use pyo3::prelude::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{count_questions, get_quiz, list_active, Quiz};
use crate::error::{QuizError, QuizResult};
use crate::users::get_user;

/// One finished attempt; rows are only ever appended
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    /// Question count at the time of the attempt
    pub total_questions: i64,
    pub completed_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Score against the question count stored with the attempt
    pub fn attempt_percentage(&self) -> u32 {
        percentage(self.score, self.total_questions)
    }
}

/// Attempt results as submitted by the quiz page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttemptSubmission {
    pub quiz_id: Option<i64>,
    pub score: Option<i64>,
    pub total: Option<i64>,
}

impl AttemptSubmission {
    pub fn new(quiz_id: i64, score: i64, total: i64) -> Self {
        Self {
            quiz_id: Some(quiz_id),
            score: Some(score),
            total: Some(total),
        }
    }

    /// Parse a JSON body; non-numeric fields are validation failures
    pub fn from_json(body: &str) -> QuizResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| QuizError::validation(format!("invalid attempt submission: {e}")))
    }

    /// Checked `(quiz_id, score, total)`
    fn validate(&self) -> QuizResult<(i64, i64, i64)> {
        let (Some(quiz_id), Some(score), Some(total)) = (self.quiz_id, self.score, self.total) else {
            return Err(QuizError::validation("quiz_id, score and total are required"));
        };
        if score < 0 || total < 0 {
            return Err(QuizError::validation("score and total must be non-negative"));
        }
        if score > total {
            return Err(QuizError::validation(format!("score {score} exceeds total {total}")));
        }
        Ok((quiz_id, score, total))
    }
}

/// Active quiz as shown on the main menu
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize)]
pub struct QuizOverview {
    pub quiz: Quiz,
    pub question_count: i64,
    pub progress_percentage: u32,
    pub last_score: Option<i64>,
    pub last_total: Option<i64>,
}

/// Aggregate progress page data
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub current_quiz: Option<Quiz>,
    pub completed_quizzes: i64,
    pub total_quizzes: i64,
    pub progress_percentage: f64,
    pub history: Vec<ProgressRecord>,
}

/// Whole percent of `score` over `total`, saturating at `u32::MAX`
fn percentage(score: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    let percent = i128::from(score.max(0)) * 100 / i128::from(total);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

const PROGRESS_COLUMNS: &str = "id, user_id, quiz_id, score, total_questions, completed_at";

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    Ok(ProgressRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        quiz_id: row.get(2)?,
        score: row.get(3)?,
        total_questions: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

/// Append an attempt completed now
pub fn record_attempt(conn: &Connection, user_id: i64, submission: &AttemptSubmission) -> QuizResult<ProgressRecord> {
    record_attempt_at(conn, user_id, submission, Utc::now())
}

/// Append an attempt with an explicit completion time
pub fn record_attempt_at(
    conn: &Connection,
    user_id: i64,
    submission: &AttemptSubmission,
    completed_at: DateTime<Utc>,
) -> QuizResult<ProgressRecord> {
    let (quiz_id, score, total) = submission.validate()?;
    get_user(conn, user_id)?;
    get_quiz(conn, quiz_id)?;

    conn.execute(
        "INSERT INTO quiz_progress (user_id, quiz_id, score, total_questions, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, quiz_id, score, total, completed_at],
    )?;

    Ok(ProgressRecord {
        id: conn.last_insert_rowid(),
        user_id,
        quiz_id,
        score,
        total_questions: total,
        completed_at,
    })
}

/// Best score over the quiz's current question count, truncated to a whole percent.
///
/// The current count is used rather than the stored per-attempt total, so a
/// quiz that changed size after an attempt skews this value.
pub fn best_score_percentage(conn: &Connection, user_id: i64, quiz_id: i64) -> QuizResult<u32> {
    get_quiz(conn, quiz_id)?;
    let best: Option<i64> = conn.query_row(
        "SELECT MAX(score) FROM quiz_progress WHERE user_id = ?1 AND quiz_id = ?2",
        params![user_id, quiz_id],
        |row| row.get(0),
    )?;

    let Some(best) = best else {
        return Ok(0);
    };
    Ok(percentage(best, count_questions(conn, quiz_id)?))
}

/// Attempts of a user, newest first
pub fn history(conn: &Connection, user_id: i64, limit: Option<usize>) -> QuizResult<Vec<ProgressRecord>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM quiz_progress WHERE user_id = ?1
         ORDER BY completed_at DESC, id DESC LIMIT ?2"
    ))?;
    let records = stmt
        .query_map(params![user_id, limit], progress_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

pub fn last_attempt(conn: &Connection, user_id: i64, quiz_id: i64) -> QuizResult<Option<ProgressRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {PROGRESS_COLUMNS} FROM quiz_progress WHERE user_id = ?1 AND quiz_id = ?2
                 ORDER BY completed_at DESC, id DESC LIMIT 1"
            ),
            params![user_id, quiz_id],
            progress_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Distinct active quizzes attempted by the user
fn completed_active_quizzes(conn: &Connection, user_id: i64) -> QuizResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(DISTINCT p.quiz_id)
         FROM quiz_progress p
         JOIN quiz q ON q.id = p.quiz_id
         WHERE p.user_id = ?1 AND q.is_beta = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn active_quiz_count(conn: &Connection) -> QuizResult<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM quiz WHERE is_beta = 0", [], |row| row.get(0))?;
    Ok(count)
}

/// Share of active quizzes the user attempted at least once, 0-100
pub fn overall_completion_percentage(conn: &Connection, user_id: i64) -> QuizResult<f64> {
    let total = active_quiz_count(conn)?;
    if total == 0 {
        return Ok(0.0);
    }
    let completed = completed_active_quizzes(conn, user_id)?;
    Ok(completed as f64 / total as f64 * 100.0)
}

/// Main menu rows for every active quiz
pub fn quiz_overview(conn: &Connection, user_id: i64) -> QuizResult<Vec<QuizOverview>> {
    list_active(conn)?
        .into_iter()
        .map(|quiz| {
            let question_count = count_questions(conn, quiz.id)?;
            let progress_percentage = best_score_percentage(conn, user_id, quiz.id)?;
            let last = last_attempt(conn, user_id, quiz.id)?;
            Ok(QuizOverview {
                quiz,
                question_count,
                progress_percentage,
                last_score: last.as_ref().map(|r| r.score),
                last_total: last.as_ref().map(|r| r.total_questions),
            })
        })
        .collect()
}

pub fn progress_summary(conn: &Connection, user_id: i64) -> QuizResult<ProgressSummary> {
    let user = get_user(conn, user_id)?;
    let current_quiz = match user.current_quiz_id {
        Some(quiz_id) => Some(get_quiz(conn, quiz_id)?),
        None => None,
    };

    Ok(ProgressSummary {
        current_quiz,
        completed_quizzes: completed_active_quizzes(conn, user_id)?,
        total_quizzes: active_quiz_count(conn)?,
        progress_percentage: overall_completion_percentage(conn, user_id)?,
        history: history(conn, user_id, None)?,
    })
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "record_attempt")]
pub fn py_record_attempt(db_path: &str, user_id: i64, quiz_id: Option<i64>, score: Option<i64>, total: Option<i64>) -> PyResult<ProgressRecord> {
    let conn = crate::db::open_database(db_path)?;
    let submission = AttemptSubmission { quiz_id, score, total };
    Ok(record_attempt(&conn, user_id, &submission)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "best_score_percentage")]
pub fn py_best_score_percentage(db_path: &str, user_id: i64, quiz_id: i64) -> PyResult<u32> {
    let conn = crate::db::open_database(db_path)?;
    Ok(best_score_percentage(&conn, user_id, quiz_id)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "history")]
pub fn py_history(db_path: &str, user_id: i64, limit: Option<usize>) -> PyResult<Vec<ProgressRecord>> {
    let conn = crate::db::open_database(db_path)?;
    Ok(history(&conn, user_id, limit)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "overall_completion_percentage")]
pub fn py_overall_completion_percentage(db_path: &str, user_id: i64) -> PyResult<f64> {
    let conn = crate::db::open_database(db_path)?;
    Ok(overall_completion_percentage(&conn, user_id)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "quiz_overview")]
pub fn py_quiz_overview(db_path: &str, user_id: i64) -> PyResult<Vec<QuizOverview>> {
    let conn = crate::db::open_database(db_path)?;
    Ok(quiz_overview(&conn, user_id)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "progress_summary")]
pub fn py_progress_summary(db_path: &str, user_id: i64) -> PyResult<ProgressSummary> {
    let conn = crate::db::open_database(db_path)?;
    Ok(progress_summary(&conn, user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_quiz, init_schema, insert_question, set_quiz_beta, NewQuiz, QuestionDraft};
    use crate::users::{register_user, set_current_quiz, NewUser};
    use chrono::Duration;

    struct Fixture {
        conn: Connection,
        user_id: i64,
    }

    fn setup() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let user = register_user(
            &conn,
            &NewUser {
                name: "Ana".to_string(),
                phone_number: "111".to_string(),
                ..NewUser::default()
            },
            Utc::now(),
            3,
        )
        .unwrap();
        Fixture { conn, user_id: user.id }
    }

    fn quiz_with_questions(conn: &Connection, title: &str, count: i64) -> i64 {
        let quiz_id = create_quiz(
            conn,
            &NewQuiz {
                title: title.to_string(),
                description: None,
                category: Some("Pediatrics".to_string()),
                difficulty: Some("Advanced".to_string()),
            },
        )
        .unwrap();
        for order in 0..count {
            insert_question(
                conn,
                quiz_id,
                &QuestionDraft {
                    order_num: order,
                    question_text: format!("Q{order}"),
                    option_a: "a".to_string(),
                    option_b: "b".to_string(),
                    option_c: None,
                    option_d: None,
                    option_e: None,
                    correct_answers: "A".to_string(),
                },
            )
            .unwrap();
        }
        quiz_id
    }

    #[test]
    fn best_score_uses_current_question_count() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 10);

        assert_eq!(best_score_percentage(&f.conn, f.user_id, quiz_id).unwrap(), 0);

        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, 8, 10)).unwrap();
        assert_eq!(best_score_percentage(&f.conn, f.user_id, quiz_id).unwrap(), 80);

        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, 6, 10)).unwrap();
        assert_eq!(best_score_percentage(&f.conn, f.user_id, quiz_id).unwrap(), 80);
    }

    #[test]
    fn best_score_never_decreases() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 10);

        let mut previous = 0;
        for score in [3, 7, 2, 7, 9, 0, 5] {
            record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, score, 10)).unwrap();
            let best = best_score_percentage(&f.conn, f.user_id, quiz_id).unwrap();
            assert!(best >= previous);
            previous = best;
        }
        assert_eq!(previous, 90);
    }

    #[test]
    fn oversized_scores_do_not_overflow() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 1);

        let huge = i64::MAX / 10;
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, huge, huge)).unwrap();
        assert_eq!(best_score_percentage(&f.conn, f.user_id, quiz_id).unwrap(), u32::MAX);

        let overview = quiz_overview(&f.conn, f.user_id).unwrap();
        assert_eq!(overview[0].progress_percentage, u32::MAX);

        let records = history(&f.conn, f.user_id, None).unwrap();
        assert_eq!(records[0].attempt_percentage(), 100);
    }

    #[test]
    fn large_scores_saturate_instead_of_wrapping() {
        let f = setup();
        let rickets = quiz_with_questions(&f.conn, "Rickets", 1);
        let neonatology = quiz_with_questions(&f.conn, "Neonatology", 1);

        // 5_000_000_000 percent does not fit in u32
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(rickets, 50_000_000, 50_000_000)).unwrap();
        assert_eq!(best_score_percentage(&f.conn, f.user_id, rickets).unwrap(), u32::MAX);

        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(neonatology, 40_000_000, 40_000_000)).unwrap();
        assert_eq!(best_score_percentage(&f.conn, f.user_id, neonatology).unwrap(), 4_000_000_000);
    }

    #[test]
    fn percentage_truncates_and_handles_empty_totals() {
        assert_eq!(percentage(2, 3), 66);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(i64::MAX, 1), u32::MAX);
    }

    #[test]
    fn invalid_submissions_are_rejected() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 10);

        let over = AttemptSubmission::new(quiz_id, 11, 10);
        assert!(matches!(record_attempt(&f.conn, f.user_id, &over), Err(QuizError::Validation(_))));

        let negative = AttemptSubmission::new(quiz_id, -1, 10);
        assert!(matches!(record_attempt(&f.conn, f.user_id, &negative), Err(QuizError::Validation(_))));

        let missing = AttemptSubmission { quiz_id: None, score: Some(1), total: Some(2) };
        assert!(matches!(record_attempt(&f.conn, f.user_id, &missing), Err(QuizError::Validation(_))));

        let unknown_quiz = AttemptSubmission::new(quiz_id + 100, 1, 2);
        assert!(matches!(record_attempt(&f.conn, f.user_id, &unknown_quiz), Err(QuizError::NotFound { .. })));

        assert!(history(&f.conn, f.user_id, None).unwrap().is_empty());
    }

    #[test]
    fn submissions_parse_from_json() {
        let ok = AttemptSubmission::from_json(r#"{"quiz_id": 3, "score": 4, "total": 5}"#).unwrap();
        assert_eq!(ok.score, Some(4));

        let missing = AttemptSubmission::from_json(r#"{"quiz_id": 3}"#).unwrap();
        assert_eq!(missing.total, None);

        let non_numeric = AttemptSubmission::from_json(r#"{"quiz_id": 3, "score": "four", "total": 5}"#);
        assert!(matches!(non_numeric, Err(QuizError::Validation(_))));
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 10);
        let start = Utc::now() - Duration::days(1);

        for (offset, score) in [(0, 1), (2, 3), (1, 2)] {
            record_attempt_at(
                &f.conn,
                f.user_id,
                &AttemptSubmission::new(quiz_id, score, 10),
                start + Duration::minutes(offset),
            )
            .unwrap();
        }

        let all: Vec<i64> = history(&f.conn, f.user_id, None).unwrap().iter().map(|r| r.score).collect();
        assert_eq!(all, vec![3, 2, 1]);

        let latest = history(&f.conn, f.user_id, Some(2)).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].score, 3);
        assert_eq!(latest[0].attempt_percentage(), 30);
    }

    #[test]
    fn completion_counts_distinct_active_quizzes() {
        let f = setup();
        let first = quiz_with_questions(&f.conn, "Rickets", 2);
        let second = quiz_with_questions(&f.conn, "Bronchitis", 2);
        quiz_with_questions(&f.conn, "Neonatology", 2);
        quiz_with_questions(&f.conn, "Malnutrition", 2);
        let beta = quiz_with_questions(&f.conn, "Beta", 2);
        set_quiz_beta(&f.conn, beta, true).unwrap();

        assert_eq!(overall_completion_percentage(&f.conn, f.user_id).unwrap(), 0.0);

        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(first, 1, 2)).unwrap();
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(first, 2, 2)).unwrap();
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(second, 0, 2)).unwrap();
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(beta, 2, 2)).unwrap();

        assert_eq!(overall_completion_percentage(&f.conn, f.user_id).unwrap(), 50.0);
    }

    #[test]
    fn overview_reports_best_and_last_attempts() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 4);
        quiz_with_questions(&f.conn, "Bronchitis", 2);
        let start = Utc::now() - Duration::hours(1);

        record_attempt_at(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, 4, 4), start).unwrap();
        record_attempt_at(
            &f.conn,
            f.user_id,
            &AttemptSubmission::new(quiz_id, 1, 4),
            start + Duration::minutes(5),
        )
        .unwrap();

        let overview = quiz_overview(&f.conn, f.user_id).unwrap();
        assert_eq!(overview.len(), 2);

        let rickets = overview.iter().find(|o| o.quiz.id == quiz_id).unwrap();
        assert_eq!(rickets.question_count, 4);
        assert_eq!(rickets.progress_percentage, 100);
        assert_eq!(rickets.last_score, Some(1));
        assert_eq!(rickets.last_total, Some(4));

        let untouched = overview.iter().find(|o| o.quiz.id != quiz_id).unwrap();
        assert_eq!(untouched.progress_percentage, 0);
        assert_eq!(untouched.last_score, None);
    }

    #[test]
    fn summary_includes_current_quiz_and_history() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 4);
        quiz_with_questions(&f.conn, "Bronchitis", 4);
        set_current_quiz(&f.conn, f.user_id, Some(quiz_id)).unwrap();
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, 3, 4)).unwrap();

        let summary = progress_summary(&f.conn, f.user_id).unwrap();
        assert_eq!(summary.current_quiz.map(|q| q.id), Some(quiz_id));
        assert_eq!(summary.completed_quizzes, 1);
        assert_eq!(summary.total_quizzes, 2);
        assert_eq!(summary.progress_percentage, 50.0);
        assert_eq!(summary.history.len(), 1);
    }

    #[test]
    fn quiz_with_history_cannot_be_deleted() {
        let f = setup();
        let quiz_id = quiz_with_questions(&f.conn, "Rickets", 2);
        record_attempt(&f.conn, f.user_id, &AttemptSubmission::new(quiz_id, 1, 2)).unwrap();

        let err = crate::db::delete_quiz(&f.conn, quiz_id).unwrap_err();
        assert!(matches!(err, QuizError::Constraint(_)));
        assert_eq!(history(&f.conn, f.user_id, None).unwrap().len(), 1);
    }
}
