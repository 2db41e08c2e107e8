//! Database schema and quiz catalog storage for MedQuiz

#[cfg(feature = "python")]
use pyo3::prelude::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QuizError, QuizResult};
use crate::questions::{classify_answers, AnswerKind, QuestionFilter};

/// Option slot letters in storage order
pub const OPTION_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Quiz catalog entry
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub is_beta: bool,
    pub created_at: DateTime<Utc>,
}

/// A single multiple-choice question owned by a quiz
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub option_e: Option<String>,
    pub correct_answers: String,
    pub order_num: i64,
}

impl QuestionRecord {
    /// Option slots paired with their letters, unused slots as `None`
    pub fn option_slots(&self) -> [(&'static str, Option<&str>); 5] {
        [
            (OPTION_LETTERS[0], Some(self.option_a.as_str())),
            (OPTION_LETTERS[1], Some(self.option_b.as_str())),
            (OPTION_LETTERS[2], self.option_c.as_deref()),
            (OPTION_LETTERS[3], self.option_d.as_deref()),
            (OPTION_LETTERS[4], self.option_e.as_deref()),
        ]
    }

    pub fn answer_kind(&self) -> AnswerKind {
        classify_answers(&self.correct_answers)
    }
}

/// Quiz metadata for insertion
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

/// Validated question content ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub order_num: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub option_e: Option<String>,
    pub correct_answers: String,
}

/// Quiz details with answer-type breakdown
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub total_questions: i64,
    pub single_answer_count: i64,
    pub multiple_answer_count: i64,
}

/// Open a database file and enable foreign key enforcement
pub fn open_database(db_path: impl AsRef<Path>) -> QuizResult<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}

/// Open a database file and make sure the schema exists
pub fn init_database(db_path: impl AsRef<Path>) -> QuizResult<Connection> {
    let conn = open_database(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create all tables and indexes if missing
pub fn init_schema(conn: &Connection) -> QuizResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quiz (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            description TEXT,
            category TEXT,
            difficulty TEXT,
            is_beta INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS question (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE CASCADE,
            question_text TEXT NOT NULL,
            option_a TEXT NOT NULL,
            option_b TEXT NOT NULL,
            option_c TEXT,
            option_d TEXT,
            option_e TEXT,
            correct_answers TEXT NOT NULL,
            order_num INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_quiz ON question(quiz_id, order_num)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone_number TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            password_hash TEXT,
            language TEXT NOT NULL DEFAULT 'en',
            created_at TEXT NOT NULL,
            trial_end_date TEXT,
            is_paid INTEGER NOT NULL DEFAULT 0,
            current_quiz_id INTEGER REFERENCES quiz(id) ON DELETE SET NULL,
            locked_home_page TEXT
        )",
        [],
    )?;

    // Progress rows are append-only; the quiz reference has no cascade so a
    // quiz with history cannot be deleted out from under it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS quiz_progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            quiz_id INTEGER NOT NULL REFERENCES quiz(id),
            score INTEGER NOT NULL CHECK (score >= 0),
            total_questions INTEGER NOT NULL CHECK (total_questions >= score),
            completed_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_progress_user ON quiz_progress(user_id, completed_at)",
        [],
    )?;

    Ok(())
}

const QUIZ_COLUMNS: &str = "id, title, description, category, difficulty, is_beta, created_at";

const QUESTION_COLUMNS: &str = "id, quiz_id, question_text, option_a, option_b, option_c, option_d, option_e, correct_answers, order_num";

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        difficulty: row.get(4)?,
        is_beta: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<QuestionRecord> {
    Ok(QuestionRecord {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        question_text: row.get(2)?,
        option_a: row.get(3)?,
        option_b: row.get(4)?,
        option_c: row.get(5)?,
        option_d: row.get(6)?,
        option_e: row.get(7)?,
        correct_answers: row.get(8)?,
        order_num: row.get(9)?,
    })
}

/// Non-beta quizzes in catalog order
pub fn list_active(conn: &Connection) -> QuizResult<Vec<Quiz>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quiz WHERE is_beta = 0 ORDER BY id"
    ))?;
    let quizzes = stmt
        .query_map([], quiz_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(quizzes)
}

/// Every quiz including beta entries
pub fn list_all(conn: &Connection) -> QuizResult<Vec<Quiz>> {
    let mut stmt = conn.prepare(&format!("SELECT {QUIZ_COLUMNS} FROM quiz ORDER BY id"))?;
    let quizzes = stmt
        .query_map([], quiz_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(quizzes)
}

pub fn get_quiz(conn: &Connection, quiz_id: i64) -> QuizResult<Quiz> {
    conn.query_row(
        &format!("SELECT {QUIZ_COLUMNS} FROM quiz WHERE id = ?1"),
        params![quiz_id],
        quiz_from_row,
    )
    .optional()?
    .ok_or_else(|| QuizError::not_found("Quiz", quiz_id))
}

pub fn find_quiz_by_title(conn: &Connection, title: &str) -> QuizResult<Option<Quiz>> {
    let quiz = conn
        .query_row(
            &format!("SELECT {QUIZ_COLUMNS} FROM quiz WHERE title = ?1"),
            params![title],
            quiz_from_row,
        )
        .optional()?;
    Ok(quiz)
}

/// Insert a quiz and return its id
pub fn create_quiz(conn: &Connection, quiz: &NewQuiz) -> QuizResult<i64> {
    conn.execute(
        "INSERT INTO quiz (title, description, category, difficulty, is_beta, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![quiz.title, quiz.description, quiz.category, quiz.difficulty, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_quiz_beta(conn: &Connection, quiz_id: i64, is_beta: bool) -> QuizResult<()> {
    let updated = conn.execute(
        "UPDATE quiz SET is_beta = ?1 WHERE id = ?2",
        params![is_beta, quiz_id],
    )?;
    if updated == 0 {
        return Err(QuizError::not_found("Quiz", quiz_id));
    }
    Ok(())
}

/// Delete a quiz and, through the cascade, all of its questions.
///
/// Refused with [`QuizError::Constraint`] while progress records point at it.
pub fn delete_quiz(conn: &Connection, quiz_id: i64) -> QuizResult<()> {
    let deleted = conn.execute("DELETE FROM quiz WHERE id = ?1", params![quiz_id])?;
    if deleted == 0 {
        return Err(QuizError::not_found("Quiz", quiz_id));
    }
    Ok(())
}

/// Remove every question of a quiz, returning how many were removed
pub fn delete_questions(conn: &Connection, quiz_id: i64) -> QuizResult<usize> {
    let deleted = conn.execute("DELETE FROM question WHERE quiz_id = ?1", params![quiz_id])?;
    Ok(deleted)
}

pub fn insert_question(conn: &Connection, quiz_id: i64, draft: &QuestionDraft) -> QuizResult<i64> {
    conn.execute(
        "INSERT INTO question (quiz_id, question_text, option_a, option_b, option_c, option_d, option_e, correct_answers, order_num)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            quiz_id,
            draft.question_text,
            draft.option_a,
            draft.option_b,
            draft.option_c,
            draft.option_d,
            draft.option_e,
            draft.correct_answers,
            draft.order_num,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Questions of a quiz in their stored order
pub fn get_questions(conn: &Connection, quiz_id: i64) -> QuizResult<Vec<QuestionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM question WHERE quiz_id = ?1 ORDER BY order_num, id"
    ))?;
    let questions = stmt
        .query_map(params![quiz_id], question_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(questions)
}

/// Ordered questions of an existing quiz restricted by answer type
pub fn get_questions_filtered(
    conn: &Connection,
    quiz_id: i64,
    filter: QuestionFilter,
) -> QuizResult<Vec<QuestionRecord>> {
    get_quiz(conn, quiz_id)?;
    let questions = get_questions(conn, quiz_id)?;
    Ok(filter.apply(questions))
}

pub fn count_questions(conn: &Connection, quiz_id: i64) -> QuizResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM question WHERE quiz_id = ?1",
        params![quiz_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn quiz_summary(conn: &Connection, quiz_id: i64) -> QuizResult<QuizSummary> {
    let quiz = get_quiz(conn, quiz_id)?;
    let questions = get_questions(conn, quiz_id)?;

    let multiple = questions
        .iter()
        .filter(|q| q.answer_kind() == AnswerKind::Multiple)
        .count() as i64;
    let total = questions.len() as i64;

    Ok(QuizSummary {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        total_questions: total,
        single_answer_count: total - multiple,
        multiple_answer_count: multiple,
    })
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "init_database")]
pub fn py_init_database(db_path: &str) -> PyResult<()> {
    init_database(db_path)?;
    Ok(())
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "list_active")]
pub fn py_list_active(db_path: &str) -> PyResult<Vec<Quiz>> {
    let conn = open_database(db_path)?;
    Ok(list_active(&conn)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_quiz")]
pub fn py_get_quiz(db_path: &str, quiz_id: i64) -> PyResult<Quiz> {
    let conn = open_database(db_path)?;
    Ok(get_quiz(&conn, quiz_id)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_questions_filtered")]
pub fn py_get_questions_filtered(db_path: &str, quiz_id: i64, filter: Option<&str>) -> PyResult<Vec<QuestionRecord>> {
    let conn = open_database(db_path)?;
    let filter = filter.unwrap_or("all").parse::<QuestionFilter>()?;
    Ok(get_questions_filtered(&conn, quiz_id, filter)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "quiz_summary")]
pub fn py_quiz_summary(db_path: &str, quiz_id: i64) -> PyResult<QuizSummary> {
    let conn = open_database(db_path)?;
    Ok(quiz_summary(&conn, quiz_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(order: i64, correct: &str) -> QuestionDraft {
        QuestionDraft {
            order_num: order,
            question_text: format!("Question {order}"),
            option_a: "alpha".to_string(),
            option_b: "beta".to_string(),
            option_c: Some("gamma".to_string()),
            option_d: None,
            option_e: None,
            correct_answers: correct.to_string(),
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn new_quiz(title: &str) -> NewQuiz {
        NewQuiz {
            title: title.to_string(),
            description: Some("desc".to_string()),
            category: Some("Pediatrics".to_string()),
            difficulty: Some("Advanced".to_string()),
        }
    }

    #[test]
    fn list_active_skips_beta_quizzes() {
        let conn = setup();
        let first = create_quiz(&conn, &new_quiz("Rickets")).unwrap();
        let second = create_quiz(&conn, &new_quiz("Bronchitis")).unwrap();
        set_quiz_beta(&conn, second, true).unwrap();

        let active = list_active(&conn).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first);
        assert_eq!(list_all(&conn).unwrap().len(), 2);
    }

    #[test]
    fn get_quiz_reports_not_found() {
        let conn = setup();
        let err = get_quiz(&conn, 42).unwrap_err();
        assert!(matches!(err, QuizError::NotFound { entity: "Quiz", .. }));
    }

    #[test]
    fn duplicate_title_is_a_constraint_violation() {
        let conn = setup();
        create_quiz(&conn, &new_quiz("Neonatology")).unwrap();
        let err = create_quiz(&conn, &new_quiz("Neonatology")).unwrap_err();
        assert!(matches!(err, QuizError::Constraint(_)));
    }

    #[test]
    fn questions_come_back_in_order_index_order() {
        let conn = setup();
        let quiz_id = create_quiz(&conn, &new_quiz("Rickets")).unwrap();
        insert_question(&conn, quiz_id, &draft(2, "A")).unwrap();
        insert_question(&conn, quiz_id, &draft(0, "B")).unwrap();
        insert_question(&conn, quiz_id, &draft(1, "A,C")).unwrap();

        let orders: Vec<i64> = get_questions(&conn, quiz_id)
            .unwrap()
            .iter()
            .map(|q| q.order_num)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn filtered_questions_follow_answer_kind() {
        let conn = setup();
        let quiz_id = create_quiz(&conn, &new_quiz("Rickets")).unwrap();
        insert_question(&conn, quiz_id, &draft(0, "A")).unwrap();
        insert_question(&conn, quiz_id, &draft(1, " A,C ")).unwrap();
        insert_question(&conn, quiz_id, &draft(2, "B")).unwrap();

        let single = get_questions_filtered(&conn, quiz_id, QuestionFilter::SingleAnswer).unwrap();
        let multiple = get_questions_filtered(&conn, quiz_id, QuestionFilter::MultipleAnswer).unwrap();
        let all = get_questions_filtered(&conn, quiz_id, QuestionFilter::All).unwrap();

        assert_eq!(single.iter().map(|q| q.order_num).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(multiple.iter().map(|q| q.order_num).collect::<Vec<_>>(), vec![1]);
        assert_eq!(all.len(), 3);

        let missing = get_questions_filtered(&conn, 999, QuestionFilter::All).unwrap_err();
        assert!(matches!(missing, QuizError::NotFound { .. }));
    }

    #[test]
    fn deleting_a_quiz_cascades_to_questions() {
        let conn = setup();
        let quiz_id = create_quiz(&conn, &new_quiz("Rickets")).unwrap();
        insert_question(&conn, quiz_id, &draft(0, "A")).unwrap();
        insert_question(&conn, quiz_id, &draft(1, "B")).unwrap();

        delete_quiz(&conn, quiz_id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM question", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn summary_counts_single_and_multiple_answers() {
        let conn = setup();
        let quiz_id = create_quiz(&conn, &new_quiz("Rickets")).unwrap();
        insert_question(&conn, quiz_id, &draft(0, "A")).unwrap();
        insert_question(&conn, quiz_id, &draft(1, "A,B")).unwrap();
        insert_question(&conn, quiz_id, &draft(2, "A,B,C")).unwrap();

        let summary = quiz_summary(&conn, quiz_id).unwrap();
        assert_eq!(summary.total_questions, 3);
        assert_eq!(summary.single_answer_count, 1);
        assert_eq!(summary.multiple_answer_count, 2);
    }
}
