//! Answer classification, question filtering and attempt projection

#[cfg(feature = "python")]
use pyo3::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::str::FromStr;

use crate::db::QuestionRecord;
use crate::error::QuizError;

/// Delimiter between letters of a multi-answer entry
pub const ANSWER_DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Single,
    Multiple,
}

/// Classify a stored correct-answer string.
///
/// Only the presence of the delimiter in the trimmed string matters, so
/// re-trimming or re-parsing never changes the result.
pub fn classify_answers(raw: &str) -> AnswerKind {
    if raw.trim().contains(ANSWER_DELIMITER) {
        AnswerKind::Multiple
    } else {
        AnswerKind::Single
    }
}

/// Split a correct-answer string into its letters
pub fn split_correct_answers(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if !trimmed.contains(ANSWER_DELIMITER) {
        return vec![trimmed.to_string()];
    }
    trimmed
        .split(ANSWER_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Question subset requested for an attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionFilter {
    #[default]
    All,
    SingleAnswer,
    MultipleAnswer,
}

impl QuestionFilter {
    pub fn matches(self, question: &QuestionRecord) -> bool {
        match self {
            QuestionFilter::All => true,
            QuestionFilter::SingleAnswer => question.answer_kind() == AnswerKind::Single,
            QuestionFilter::MultipleAnswer => question.answer_kind() == AnswerKind::Multiple,
        }
    }

    /// Keep matching questions, preserving their order
    pub fn apply(self, questions: Vec<QuestionRecord>) -> Vec<QuestionRecord> {
        questions.into_iter().filter(|q| self.matches(q)).collect()
    }
}

impl FromStr for QuestionFilter {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(QuestionFilter::All),
            "single" | "singleanswer" | "single_answer" => Ok(QuestionFilter::SingleAnswer),
            "multiple" | "multipleanswer" | "multiple_answer" => Ok(QuestionFilter::MultipleAnswer),
            other => Err(QuizError::validation(format!("unknown question filter '{other}'"))),
        }
    }
}

/// One labeled option shown to the quiz taker
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOption {
    pub letter: String,
    pub text: String,
}

/// Question as handed to a quiz-taking session
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize)]
pub struct AttemptQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<AnswerOption>,
    pub correct_answers: Vec<String>,
}

#[cfg(feature = "python")]
#[pymethods]
impl AttemptQuestion {
    fn __repr__(&self) -> String {
        format!("AttemptQuestion(id={}, question='{}...')",
                self.id, &self.question.chars().take(40).collect::<String>())
    }
}

fn project_question(question: &QuestionRecord) -> AttemptQuestion {
    let options: Vec<AnswerOption> = question
        .option_slots()
        .into_iter()
        .filter_map(|(letter, text)| {
            text.filter(|t| !t.trim().is_empty()).map(|t| AnswerOption {
                letter: letter.to_string(),
                text: t.to_string(),
            })
        })
        .collect();

    // Letters naming an absent slot are dropped so the answer set always
    // refers to options the taker can see.
    let correct_answers = split_correct_answers(&question.correct_answers)
        .into_iter()
        .filter(|letter| options.iter().any(|o| &o.letter == letter))
        .collect();

    AttemptQuestion {
        id: question.id,
        question: question.question_text.clone(),
        options,
        correct_answers,
    }
}

/// Project questions for an attempt and shuffle them with a fresh RNG
pub fn project_for_attempt(questions: &[QuestionRecord]) -> Vec<AttemptQuestion> {
    let mut rng = rand::thread_rng();
    project_for_attempt_with_rng(questions, &mut rng)
}

/// Same as [`project_for_attempt`] with a caller-supplied RNG
pub fn project_for_attempt_with_rng<R: Rng + ?Sized>(
    questions: &[QuestionRecord],
    rng: &mut R,
) -> Vec<AttemptQuestion> {
    let mut projected: Vec<AttemptQuestion> = questions.iter().map(project_question).collect();
    projected.shuffle(rng);
    projected
}

// ============= Python Binding =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_quiz_data")]
pub fn py_get_quiz_data(db_path: &str, quiz_id: i64, filter: Option<&str>) -> PyResult<Vec<AttemptQuestion>> {
    let conn = crate::db::open_database(db_path)?;
    let filter = filter.unwrap_or("all").parse::<QuestionFilter>()?;
    let questions = crate::db::get_questions_filtered(&conn, quiz_id, filter)?;
    Ok(project_for_attempt(&questions))
}
