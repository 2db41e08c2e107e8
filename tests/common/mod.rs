#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use medquiz_core::{db, register_user, NewUser, TopicInfo, TopicTable};
use rusqlite::Connection;

pub const HEADER: &str = "question,option_a,option_b,option_c,option_d,option_e,correct_answers";

pub fn create_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("failed to open in-memory database");
    db::init_schema(&conn).expect("failed to create schema");
    conn
}

/// Write a CSV source with the standard header and the given data lines
pub fn write_source(dir: &Path, relative: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create source directory");
    }
    let mut body = String::from(HEADER);
    for line in lines {
        body.push('\n');
        body.push_str(line);
    }
    body.push('\n');
    fs::write(&path, body).expect("failed to write source");
    path
}

/// Write an xlsx source; `rows[0]` is the header row and blank cells stay empty.
///
/// Cells that parse as numbers are stored as numeric cells.
pub fn write_workbook(dir: &Path, relative: &str, rows: &[&[&str]]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create source directory");
    }

    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).expect("default sheet missing");
    for (row_idx, cells) in rows.iter().enumerate() {
        for (col_idx, text) in cells.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let cell = sheet.get_cell_mut(((col_idx as u32) + 1, (row_idx as u32) + 1));
            match text.parse::<f64>() {
                Ok(number) => {
                    cell.set_value_number(number);
                }
                Err(_) => {
                    cell.set_value(*text);
                }
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, &path).expect("failed to write workbook");
    path
}

pub fn topic(title: &str, category: &str) -> TopicInfo {
    TopicInfo {
        title: title.to_string(),
        description: Some(format!("{title} questions")),
        category: Some(category.to_string()),
    }
}

pub fn test_topics() -> TopicTable {
    let mut table = TopicTable::default();
    table.insert("Rickets", topic("Rickets", "Pediatrics"));
    table.insert("Neonatology", topic("Neonatology", "Pediatrics"));
    table.insert("Cardiologie", topic("Cardiology", "Final Exam - English"));
    table
}

pub fn create_user(conn: &Connection, phone: &str) -> i64 {
    register_user(
        conn,
        &NewUser {
            name: "Test User".to_string(),
            phone_number: phone.to_string(),
            ..NewUser::default()
        },
        Utc::now(),
        3,
    )
    .expect("failed to register user")
    .id
}
