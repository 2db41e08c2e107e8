//! Tabular import sources (CSV and spreadsheet workbooks)

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::db::{QuestionDraft, OPTION_LETTERS};
use crate::error::{QuizError, QuizResult};
use crate::questions::ANSWER_DELIMITER;

/// File extensions recognised as question sources
pub const SOURCE_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xls", "ods"];

/// Header names every source must provide
pub const REQUIRED_COLUMNS: [&str; 4] = ["question", "option_a", "option_b", "correct_answers"];

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// One raw row of a source file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRow {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    #[serde(default)]
    pub option_e: Option<String>,
    pub correct_answers: String,
}

/// Trimmed cell, blank mapped to `None`
fn optional_cell(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SourceRow {
    /// Validate the row and turn it into a question at `index`.
    ///
    /// `index` is the zero-based position among data rows, so errors report
    /// `index + 1` and never count the header line.
    pub fn into_draft(self, index: usize) -> QuizResult<QuestionDraft> {
        let row = index + 1;
        let fail = |reason: String| QuizError::ImportRow { row, reason };

        let question_text = self.question.trim().to_string();
        let option_a = self.option_a.trim().to_string();
        let option_b = self.option_b.trim().to_string();

        if question_text.is_empty() {
            return Err(fail("question text is empty".to_string()));
        }
        if option_a.is_empty() || option_b.is_empty() {
            return Err(fail("options A and B are required".to_string()));
        }

        let draft_options = [
            Some(option_a.clone()),
            Some(option_b.clone()),
            optional_cell(self.option_c),
            optional_cell(self.option_d),
            optional_cell(self.option_e),
        ];

        let raw_answers = self.correct_answers.trim();
        if raw_answers.is_empty() {
            return Err(fail("correct_answers is empty".to_string()));
        }

        let mut letters: Vec<String> = Vec::new();
        for part in raw_answers.split(ANSWER_DELIMITER) {
            let letter = part.trim().to_uppercase();
            if letter.is_empty() {
                return Err(fail(format!("malformed correct_answers '{raw_answers}'")));
            }
            let slot = OPTION_LETTERS
                .iter()
                .position(|l| *l == letter)
                .ok_or_else(|| fail(format!("unknown option letter '{letter}'")))?;
            if draft_options[slot].is_none() {
                return Err(fail(format!("correct answer '{letter}' refers to an empty option")));
            }
            if !letters.contains(&letter) {
                letters.push(letter);
            }
        }

        let [_, _, option_c, option_d, option_e] = draft_options;

        Ok(QuestionDraft {
            order_num: index as i64,
            question_text,
            option_a,
            option_b,
            option_c,
            option_d,
            option_e,
            correct_answers: letters.join(","),
        })
    }
}

/// Row stream of a source file
pub type SourceRows = Box<dyn Iterator<Item = QuizResult<SourceRow>>>;

/// Open a source file as a row stream, dispatching on its extension
pub fn read_rows(path: &Path) -> QuizResult<SourceRows> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" | "ods" => read_workbook(path),
        _ => Err(QuizError::validation(format!("Unsupported file format: .{extension}"))),
    }
}

fn check_headers(headers: &[String]) -> QuizResult<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h.as_str() == *required))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(QuizError::validation(format!("missing required columns: {}", missing.join(", "))))
    }
}

/// Stream rows of a CSV file with a header line
pub fn read_csv(path: &Path) -> QuizResult<SourceRows> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    check_headers(&headers)?;
    reader.set_headers(csv::StringRecord::from(headers));

    Ok(Box::new(
        reader
            .into_deserialize::<SourceRow>()
            .map(|row| row.map_err(QuizError::from)),
    ))
}

/// Read the first sheet of a workbook; its first row holds the headers
pub fn read_workbook(path: &Path) -> QuizResult<SourceRows> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| QuizError::validation("No sheets found in workbook"))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| QuizError::validation("Empty workbook - no header row"))?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| cell_string(c).to_lowercase())
        .collect();
    check_headers(&headers)?;

    let columns: HashMap<String, usize> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();
    let cell = |row: &[Data], name: &str| -> Option<String> {
        columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(cell_string)
            .filter(|s| !s.is_empty())
    };

    let parsed: Vec<QuizResult<SourceRow>> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| {
            Ok(SourceRow {
                question: cell(row, "question").unwrap_or_default(),
                option_a: cell(row, "option_a").unwrap_or_default(),
                option_b: cell(row, "option_b").unwrap_or_default(),
                option_c: cell(row, "option_c"),
                option_d: cell(row, "option_d"),
                option_e: cell(row, "option_e"),
                correct_answers: cell(row, "correct_answers").unwrap_or_default(),
            })
        })
        .collect();

    Ok(Box::new(parsed.into_iter()))
}

/// Helper to extract string from a spreadsheet cell
fn cell_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        Data::Empty => String::new(),
    }
}
