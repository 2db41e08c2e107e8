//! Catalog integrity verification

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{get_questions, list_all};
use crate::error::QuizResult;
use crate::questions::{split_correct_answers, AnswerKind};

#[derive(Debug, Clone, Serialize)]
pub struct QuizBreakdown {
    pub title: String,
    pub question_count: usize,
    pub single_answer_count: usize,
    pub multiple_answer_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub question_count: usize,
    pub quizzes: Vec<QuizBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogVerification {
    pub total_quizzes: usize,
    pub total_questions: usize,
    pub categories: Vec<CategoryBreakdown>,
    pub issues: Vec<String>,
}

impl CatalogVerification {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn average_questions_per_quiz(&self) -> f64 {
        if self.total_quizzes == 0 {
            return 0.0;
        }
        self.total_questions as f64 / self.total_quizzes as f64
    }
}

/// Per-category statistics plus every integrity problem found
pub fn verify_catalog(conn: &Connection) -> QuizResult<CatalogVerification> {
    let mut report = CatalogVerification::default();
    let mut empty_quizzes = 0;
    let mut missing_required = 0;
    let mut dangling_answers = 0;

    for quiz in list_all(conn)? {
        let questions = get_questions(conn, quiz.id)?;
        if questions.is_empty() {
            empty_quizzes += 1;
        }

        let mut breakdown = QuizBreakdown {
            title: quiz.title.clone(),
            question_count: questions.len(),
            single_answer_count: 0,
            multiple_answer_count: 0,
        };

        for question in &questions {
            match question.answer_kind() {
                AnswerKind::Single => breakdown.single_answer_count += 1,
                AnswerKind::Multiple => breakdown.multiple_answer_count += 1,
            }
            if question.option_a.trim().is_empty() || question.option_b.trim().is_empty() {
                missing_required += 1;
            }
            let slots = question.option_slots();
            let dangling = split_correct_answers(&question.correct_answers).iter().any(|letter| {
                !slots
                    .iter()
                    .any(|(l, text)| *l == letter.as_str() && text.is_some_and(|t| !t.trim().is_empty()))
            });
            if dangling {
                dangling_answers += 1;
            }
        }

        report.total_quizzes += 1;
        report.total_questions += breakdown.question_count;

        // Uncategorised quizzes are counted but not listed
        let Some(category) = quiz.category else {
            continue;
        };
        match report.categories.iter_mut().find(|c| c.category == category) {
            Some(group) => {
                group.question_count += breakdown.question_count;
                group.quizzes.push(breakdown);
            }
            None => report.categories.push(CategoryBreakdown {
                category,
                question_count: breakdown.question_count,
                quizzes: vec![breakdown],
            }),
        }
    }

    let orphaned: i64 = conn.query_row(
        "SELECT COUNT(*) FROM question WHERE quiz_id NOT IN (SELECT id FROM quiz)",
        [],
        |row| row.get(0),
    )?;

    if empty_quizzes > 0 {
        report.issues.push(format!("Found {empty_quizzes} quizzes with no questions"));
    }
    if orphaned > 0 {
        report.issues.push(format!("Found {orphaned} orphaned questions"));
    }
    if missing_required > 0 {
        report.issues.push(format!("Found {missing_required} questions with missing required options"));
    }
    if dangling_answers > 0 {
        report.issues.push(format!("Found {dangling_answers} questions whose correct answers name absent options"));
    }

    Ok(report)
}
